//! Command execution tool: shell_run
//!
//! Runs `sh -c <command>` in the workspace root. The policy gate has already
//! checked the allowlist and rejected shell metacharacters by the time this
//! executes.

use async_trait::async_trait;
use nova_application::{Tool, ToolContext};
use nova_domain::{
    Arguments, Capability, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolResult,
    util::truncate_bytes,
};
use serde_json::{Map, Value};
use tokio::process::Command;

use crate::process::{self, ProcessOutcome};

/// Tool name constant
pub const SHELL_RUN: &str = "shell_run";

/// Maximum output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

pub struct ShellRunTool {
    descriptor: ToolDescriptor,
}

impl ShellRunTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            SHELL_RUN,
            "Execute an allowlisted shell command in the workspace and return its output",
        )
        .with_param(ParamSpec::required(
            "command",
            ParamKind::String,
            "The command to execute",
        ))
        .with_capability(Capability::Shell);
        Self { descriptor }
    }
}

impl Default for ShellRunTool {
    fn default() -> Self {
        Self::new()
    }
}

/// stdout, then a `--- stderr ---` block when stderr is non-empty.
fn combine_output(stdout: &str, stderr: &str) -> (String, bool) {
    let mut combined = String::new();
    if !stdout.is_empty() {
        combined.push_str(stdout);
    }
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(stderr);
    }

    if combined.len() > MAX_OUTPUT_SIZE {
        let mut cut = truncate_bytes(&combined, MAX_OUTPUT_SIZE).to_string();
        cut.push_str("\n... (output truncated)");
        return (cut, true);
    }
    (combined, false)
}

#[async_trait]
impl Tool for ShellRunTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        let command = match args.require_str("command") {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(e),
        };
        let timeout = ctx.config.tool_timeout();

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(ctx.workspace.root());

        tracing::debug!(tool = SHELL_RUN, command = %command, "Running command");
        let outcome =
            match process::run_supervised(cmd, timeout, &ctx.cancel, MAX_OUTPUT_SIZE).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    return ToolResult::failure(ToolError::internal(format!(
                        "failed to spawn command: {}",
                        e
                    )));
                }
            };

        match outcome {
            ProcessOutcome::Completed(output) if output.status.success() => {
                let (combined, truncated) =
                    combine_output(&output.stdout_lossy(), &output.stderr_lossy());
                let mut structured = Map::new();
                structured.insert("exit_code".to_string(), Value::from(0));
                if truncated || output.truncated {
                    structured.insert("truncated".to_string(), Value::Bool(true));
                }
                ToolResult::success_with(combined, structured)
            }
            ProcessOutcome::Completed(output) => ToolResult::failure(output.exit_failure()),
            ProcessOutcome::TimedOut => ToolResult::failure(ToolError::timeout(format!(
                "command after {} seconds",
                ctx.config.tool_timeout_seconds()
            ))),
            ProcessOutcome::Cancelled => ToolResult::failure(ToolError::cancelled("command")),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tools::testing::Harness;
    use nova_application::PathGuard;
    use nova_domain::ErrorKind;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    fn shell_harness(timeout_seconds: f64) -> Harness {
        Harness::with_config(|b| {
            b.allow_shell_commands(true)
                .shell_allowlist(["echo", "pwd", "sleep", "ls"])
                .tool_timeout_seconds(timeout_seconds)
        })
    }

    #[tokio::test]
    async fn test_runs_in_workspace() {
        let h = shell_harness(5.0);
        let result = ShellRunTool::new()
            .execute(&Arguments::new().with("command", "pwd"), &h.ctx())
            .await;

        let out = result.output().unwrap().trim().to_string();
        assert_eq!(std::path::Path::new(&out), h.guard.root());
        assert_eq!(result.structured().unwrap()["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_stderr_block() {
        let h = shell_harness(5.0);
        let result = ShellRunTool::new()
            .execute(
                &Arguments::new().with("command", "ls . no-such-entry"),
                &h.ctx(),
            )
            .await;

        // `ls` exits non-zero when an operand is missing.
        let err = result.error().unwrap();
        assert_eq!(err.kind, ErrorKind::NonZeroExit);
        let meta = err.metadata.as_ref().unwrap();
        assert_ne!(meta["exit_code"], 0);
        assert!(!meta["stderr"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output("out\n", ""), ("out\n".to_string(), false));
        assert_eq!(
            combine_output("out\n", "err\n"),
            ("out\n\n--- stderr ---\nerr\n".to_string(), false)
        );
        assert_eq!(combine_output("", "err"), ("err".to_string(), false));

        let big = "x".repeat(MAX_OUTPUT_SIZE + 10);
        let (cut, truncated) = combine_output(&big, "");
        assert!(truncated);
        assert!(cut.ends_with("... (output truncated)"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let h = shell_harness(1.0);
        let started = Instant::now();
        let result = ShellRunTool::new()
            .execute(&Arguments::new().with("command", "sleep 10"), &h.ctx())
            .await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let h = shell_harness(30.0);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = ShellRunTool::new()
            .execute(
                &Arguments::new().with("command", "sleep 10"),
                &h.ctx_with_cancel(cancel),
            )
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_descriptor_requires_shell() {
        let tool = ShellRunTool::new();
        assert_eq!(tool.name(), SHELL_RUN);
        assert!(tool.descriptor().requires(Capability::Shell));
    }
}
