//! Tool port
//!
//! A [`Tool`] is the polymorphic unit the dispatcher executes. Tools receive
//! already-validated [`Arguments`] and an execution [`ToolContext`]; they
//! never see raw JSON and never make policy decisions.

use async_trait::async_trait;
use nova_domain::{Arguments, ToolConfig, ToolDescriptor, ToolResult};
use tokio_util::sync::CancellationToken;

use super::path_guard::PathGuard;
use super::sandbox::SandboxPort;

/// Everything a tool may use while executing.
pub struct ToolContext<'a> {
    /// Immutable configuration snapshot
    pub config: &'a ToolConfig,
    /// Resolver that confines paths to the workspace
    pub workspace: &'a dyn PathGuard,
    /// Sandbox session (only meaningful for sandbox-capable tools)
    pub sandbox: &'a dyn SandboxPort,
    /// Fires when the caller cancels the invocation
    pub cancel: CancellationToken,
}

/// Port for a single executable tool.
///
/// Implementations live in the infrastructure layer (standard tool library)
/// or in tests.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static description: name, schema, capabilities
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run the tool.
    ///
    /// Must observe `ctx.cancel` for anything long-running and return
    /// `Err(Cancelled)` once it has cleaned up.
    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
