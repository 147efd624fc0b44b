//! Introspection tools: sys_env, sys_usage, sys_info

use async_trait::async_trait;
use nova_application::{Tool, ToolContext};
use nova_domain::{
    Arguments, Capability, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolResult,
};
use serde_json::{Map, Value};
use sysinfo::System;

/// Tool name constants
pub const SYS_ENV: &str = "sys_env";
pub const SYS_USAGE: &str = "sys_usage";
pub const SYS_INFO: &str = "sys_info";

const REDACTED: &str = "<redacted>";

/// Substrings that mark an environment variable name as a secret
const SECRET_MARKERS: &[&str] = &[
    "KEY",
    "TOKEN",
    "SECRET",
    "PASSWORD",
    "PASSWD",
    "CREDENTIAL",
    "AUTH",
    "PRIVATE",
];

pub fn is_secret_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|marker| upper.contains(marker))
}

fn shown_value<'a>(name: &str, value: &'a str) -> &'a str {
    if is_secret_name(name) { REDACTED } else { value }
}

/// `NAME=value` lines sorted by name, secrets redacted.
fn render_env(mut vars: Vec<(String, String)>) -> String {
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    vars.iter()
        .map(|(name, value)| format!("{}={}", name, shown_value(name, value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read environment variables of the tool process.
pub struct SysEnvTool {
    descriptor: ToolDescriptor,
}

impl SysEnvTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            SYS_ENV,
            "Read one environment variable, or list all of them sorted by name. Secret-looking values are redacted.",
        )
        .with_param(ParamSpec::new(
            "key",
            ParamKind::String,
            "Variable name; omit to list every variable",
        ))
        .with_capability(Capability::Introspection);
        Self { descriptor }
    }
}

impl Default for SysEnvTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SysEnvTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
        match args.get_str("key") {
            Some(key) => match std::env::var_os(key) {
                Some(value) => {
                    let value = value.to_string_lossy();
                    let redacted = is_secret_name(key);
                    let mut structured = Map::new();
                    structured.insert("key".to_string(), Value::String(key.to_string()));
                    structured.insert("redacted".to_string(), Value::Bool(redacted));
                    ToolResult::success_with(shown_value(key, &value), structured)
                }
                None => ToolResult::failure(ToolError::not_found(format!(
                    "environment variable {}",
                    key
                ))),
            },
            None => {
                let vars: Vec<(String, String)> = std::env::vars_os()
                    .map(|(k, v)| {
                        (
                            k.to_string_lossy().into_owned(),
                            v.to_string_lossy().into_owned(),
                        )
                    })
                    .collect();
                let count = vars.len();
                let mut structured = Map::new();
                structured.insert("count".to_string(), Value::from(count));
                ToolResult::success_with(render_env(vars), structured)
            }
        }
    }
}

/// CPU and memory usage of the host.
pub struct SysUsageTool {
    descriptor: ToolDescriptor,
}

impl SysUsageTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            SYS_USAGE,
            "Report current CPU usage, memory usage and platform",
        )
        .with_capability(Capability::Introspection);
        Self { descriptor }
    }
}

impl Default for SysUsageTool {
    fn default() -> Self {
        Self::new()
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

#[async_trait]
impl Tool for SysUsageTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes.
        sys.refresh_cpu_usage();
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                return ToolResult::failure(ToolError::cancelled("usage sampling"));
            }
            _ = tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL) => {}
        }
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_percent = f64::from(sys.global_cpu_usage());
        let used = sys.used_memory();
        let total = sys.total_memory();
        let memory_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let platform = format!("{} {}", std::env::consts::OS, std::env::consts::ARCH);

        let output = format!(
            "cpu: {:.1}%\nmemory: {:.1} GiB / {:.1} GiB ({:.1}%)\nplatform: {}",
            cpu_percent,
            gib(used),
            gib(total),
            memory_percent,
            platform
        );

        let mut structured = Map::new();
        structured.insert("cpu_percent".to_string(), Value::from(cpu_percent));
        structured.insert("memory_used_bytes".to_string(), Value::from(used));
        structured.insert("memory_total_bytes".to_string(), Value::from(total));
        structured.insert("memory_percent".to_string(), Value::from(memory_percent));
        structured.insert("platform".to_string(), Value::String(platform));
        ToolResult::success_with(output, structured)
    }
}

/// Operating system facts: name, version, kernel, architecture, hostname.
pub struct SysInfoTool {
    descriptor: ToolDescriptor,
}

impl SysInfoTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            SYS_INFO,
            "Report operating system name and version, kernel, architecture and hostname",
        )
        .with_capability(Capability::Introspection);
        Self { descriptor }
    }
}

impl Default for SysInfoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SysInfoTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
        let unknown = || "unknown".to_string();
        let facts = [
            ("os", System::name().unwrap_or_else(unknown)),
            ("os_version", System::os_version().unwrap_or_else(unknown)),
            ("kernel", System::kernel_version().unwrap_or_else(unknown)),
            ("arch", std::env::consts::ARCH.to_string()),
            ("hostname", System::host_name().unwrap_or_else(unknown)),
        ];

        let output = facts
            .iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect::<Vec<_>>()
            .join("\n");
        let structured = facts
            .into_iter()
            .map(|(label, value)| (label.to_string(), Value::String(value)))
            .collect();
        ToolResult::success_with(output, structured)
    }
}
