//! Sandbox port
//!
//! Lifecycle of the container session used by sandbox-capable tools. The
//! concrete runner (container CLI) lives in the infrastructure layer.

use async_trait::async_trait;
use nova_domain::{SandboxState, ToolError, ToolResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait SandboxPort: Send + Sync {
    /// Current state of the session
    fn state(&self) -> SandboxState;

    /// Bring the session up.
    ///
    /// No-op `Ok` when already running; `Err(SandboxUnavailable)` when the
    /// session has failed or was stopped. A failed start leaves the session
    /// in `Failed` and is not fatal to the caller.
    async fn start(&mut self) -> Result<(), ToolError>;

    /// Run a shell command inside the running session.
    ///
    /// `Ok(stdout)` with `{exit_code, stderr}` on exit 0; `Timeout`,
    /// `Cancelled`, `NonZeroExit` or `SandboxUnavailable` otherwise.
    async fn run_command(
        &self,
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ToolResult;

    /// Tear the session down. Idempotent, never fails.
    async fn stop(&mut self);

    /// Stop the session and replace it with a fresh, uninitialized one.
    async fn reset(&mut self);
}

/// Sandbox that can never start, for setups without a container runtime.
#[derive(Debug)]
pub struct NoSandbox {
    state: SandboxState,
}

impl NoSandbox {
    pub fn new() -> Self {
        Self {
            state: SandboxState::Uninitialized,
        }
    }
}

impl Default for NoSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxPort for NoSandbox {
    fn state(&self) -> SandboxState {
        self.state
    }

    async fn start(&mut self) -> Result<(), ToolError> {
        if self.state == SandboxState::Uninitialized {
            self.state = SandboxState::Failed;
        }
        Err(ToolError::sandbox_unavailable("no sandbox runtime configured"))
    }

    async fn run_command(
        &self,
        _command: &str,
        _timeout: Duration,
        _cancel: &CancellationToken,
    ) -> ToolResult {
        ToolResult::failure(ToolError::sandbox_unavailable(format!(
            "sandbox is {}",
            self.state
        )))
    }

    async fn stop(&mut self) {
        if self.state == SandboxState::Uninitialized {
            self.state = SandboxState::Stopped;
        }
    }

    async fn reset(&mut self) {
        self.state = SandboxState::Uninitialized;
    }
}
