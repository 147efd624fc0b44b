//! sandbox_exec tool: run a command inside the container session

use async_trait::async_trait;
use nova_application::{Tool, ToolContext};
use nova_domain::{
    Arguments, Capability, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolResult,
};
use std::time::Duration;

/// Tool name constant
pub const SANDBOX_EXEC: &str = "sandbox_exec";

pub struct SandboxExecTool {
    descriptor: ToolDescriptor,
}

impl SandboxExecTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            SANDBOX_EXEC,
            "Run a shell command inside the isolated sandbox container",
        )
        .with_param(ParamSpec::required(
            "command",
            ParamKind::String,
            "Command to run with sh -c inside the container",
        ))
        .with_param(ParamSpec::new(
            "timeout_seconds",
            ParamKind::Number,
            "Timeout in seconds (defaults to the configured tool timeout)",
        ))
        .with_capability(Capability::Sandbox);
        Self { descriptor }
    }
}

impl Default for SandboxExecTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SandboxExecTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        let command = match args.require_str("command") {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(e),
        };

        let timeout = match args.get_f64("timeout_seconds") {
            None => ctx.config.tool_timeout(),
            Some(secs) => match parse_timeout(secs) {
                Ok(t) => t,
                Err(e) => return ToolResult::failure(e),
            },
        };

        tracing::debug!(tool = SANDBOX_EXEC, command = %command, ?timeout, "Sandbox exec");
        ctx.sandbox.run_command(command, timeout, &ctx.cancel).await
    }
}

fn parse_timeout(secs: f64) -> Result<Duration, ToolError> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(ToolError::bad_argument(
            "timeout_seconds: must be greater than zero",
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ToolError::bad_argument("timeout_seconds: value is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::Harness;
    use nova_domain::ErrorKind;

    #[tokio::test]
    async fn test_without_running_sandbox() {
        let h = Harness::new();
        let result = SandboxExecTool::new()
            .execute(&Arguments::new().with("command", "python -V"), &h.ctx())
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::SandboxUnavailable));
    }

    #[tokio::test]
    async fn test_rejects_zero_timeout() {
        let h = Harness::new();
        let args = Arguments::new()
            .with("command", "true")
            .with("timeout_seconds", 0);
        let result = SandboxExecTool::new().execute(&args, &h.ctx()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::BadArgument));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_timeout() {
        let h = Harness::new();
        let args = Arguments::new()
            .with("command", "true")
            .with("timeout_seconds", 1e20);
        let result = SandboxExecTool::new().execute(&args, &h.ctx()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::BadArgument));
        assert!(result.error().unwrap().message.contains("too large"));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(1.5).unwrap(), Duration::from_millis(1500));
        assert!(parse_timeout(-1.0).is_err());
        assert!(parse_timeout(f64::NAN).is_err());
        assert!(parse_timeout(f64::MAX).is_err());
    }

    #[test]
    fn test_descriptor_requires_sandbox() {
        let tool = SandboxExecTool::new();
        assert!(tool.descriptor().requires(Capability::Sandbox));
        assert!(!tool.descriptor().requires(Capability::Shell));
    }
}
