//! Policy gate: the single place where permission decisions are made.
//!
//! The gate consults the config snapshot, the tool's declared capabilities,
//! the validated arguments and the sandbox state. Tools themselves never
//! decide whether they are allowed to run.
//!
//! | Capability | Rule |
//! |------------|------|
//! | `shell` | shell enabled, first token allowlisted verbatim, no destructive patterns or metacharacters |
//! | `network` | `network_allowed` |
//! | `sandbox` | sandbox session is `Running` |
//! | `filesystem` | none here (the workspace guard confines paths) |
//! | `introspection` | none |

use regex::Regex;
use std::sync::LazyLock;

use crate::config::ToolConfig;
use crate::sandbox::SandboxState;
use crate::tool::{Arguments, Capability, ToolDescriptor, ToolError};

/// Argument that carries the command line for shell-capable tools.
pub const COMMAND_ARG: &str = "command";

/// Substrings that would let a command escape the allowlist check.
const SHELL_METACHARACTERS: &[&str] = &[";", "&", "|", "`", "$(", "${", ">", "<", "\n", "\r"];

/// Markers of a tool-call blob smuggled inside a command.
const NESTED_TOOL_CALLS: &[&str] = &["{\"tool\":", "{'tool':"];

/// Commands that destroy data even when their program is allowlisted.
const DESTRUCTIVE_PATTERNS: &[&str] = &[
    r"(?i)\brm\s+-rf\b",
    r"(?i)\bformat\b",
    r"(?i)\bdd\b.*if=/dev/",
    r"(?i)\bmkfs\b",
    r"(?i)\bshred\b",
];

static DESTRUCTIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DESTRUCTIVE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Redirection into a device; `/dev/null` is the one harmless target.
static DEVICE_REDIRECT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)>\s*/dev/([A-Za-z0-9_./-]*)").ok());

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyGate;

impl PolicyGate {
    /// Permit (`Ok`) or deny the invocation.
    ///
    /// Denials are `FORBIDDEN`, except a non-running sandbox which is
    /// reported as `SANDBOX_UNAVAILABLE`.
    pub fn evaluate(
        config: &ToolConfig,
        descriptor: &ToolDescriptor,
        args: &Arguments,
        sandbox: SandboxState,
    ) -> Result<(), ToolError> {
        for capability in &descriptor.capabilities {
            match capability {
                Capability::Shell => Self::check_shell(config, args)?,
                Capability::Network => {
                    if !config.network_allowed() {
                        return Err(ToolError::forbidden("network access is disabled"));
                    }
                }
                Capability::Sandbox => {
                    if !sandbox.is_running() {
                        return Err(ToolError::sandbox_unavailable(format!(
                            "sandbox is {}",
                            sandbox
                        )));
                    }
                }
                Capability::Filesystem | Capability::Introspection => {}
            }
        }
        Ok(())
    }

    fn check_shell(config: &ToolConfig, args: &Arguments) -> Result<(), ToolError> {
        if !config.allow_shell_commands() {
            return Err(ToolError::forbidden("shell commands are disabled"));
        }

        let command = args
            .get_str(COMMAND_ARG)
            .ok_or_else(|| ToolError::forbidden("shell tool called without a command"))?;

        if NESTED_TOOL_CALLS.iter().any(|m| command.contains(m)) {
            return Err(ToolError::forbidden(
                "nested tool calls are not allowed in commands",
            ));
        }

        if let Some(pattern) = destructive_pattern(command) {
            return Err(ToolError::forbidden(format!(
                "command contains destructive pattern: {}",
                pattern
            )));
        }

        if let Some(meta) = SHELL_METACHARACTERS.iter().find(|m| command.contains(**m)) {
            return Err(ToolError::forbidden(format!(
                "shell metacharacter '{}' is not allowed",
                meta.escape_default()
            )));
        }

        let program = first_token(command)
            .ok_or_else(|| ToolError::forbidden("empty command"))?;
        if !config.is_allowlisted(program) {
            return Err(ToolError::forbidden(format!(
                "command '{}' is not in the shell allowlist",
                program
            )));
        }
        Ok(())
    }
}

/// First whitespace-separated token. Compared against the allowlist as is:
/// `/bin/ls` and `./ls` are different programs from `ls`.
pub fn first_token(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

fn destructive_pattern(command: &str) -> Option<&str> {
    if let Some(found) = DESTRUCTIVE.iter().find(|re| re.is_match(command)) {
        return Some(found.as_str());
    }
    let redirect = DEVICE_REDIRECT.as_ref()?;
    redirect
        .captures_iter(command)
        .find(|caps| !caps[1].eq_ignore_ascii_case("null"))
        .map(|_| redirect.as_str())
}
