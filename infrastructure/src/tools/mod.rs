//! Standard tool library
//!
//! Concrete [`Tool`](nova_application::Tool) implementations the agent can
//! call:
//!
//! - `file`: file_read, file_write, file_list (workspace-confined)
//! - `shell`: shell_run (allowlisted, metacharacter-free commands)
//! - `web`: web_get (behind the `web-tools` feature)
//! - `sys`: sys_env, sys_usage, sys_info
//! - `sandbox_exec`: commands inside the container session

pub mod file;
pub mod sandbox_exec;
pub mod schema;
pub mod shell;
pub mod sys;
#[cfg(feature = "web-tools")]
pub mod web;

#[cfg(test)]
pub(crate) mod testing;


pub use file::{FileListTool, FileReadTool, FileWriteTool};
pub use sandbox_exec::SandboxExecTool;
pub use schema::JsonSchemaToolConverter;
pub use shell::ShellRunTool;
pub use sys::{SysEnvTool, SysInfoTool, SysUsageTool};
#[cfg(feature = "web-tools")]
pub use web::WebGetTool;

use nova_application::ToolRegistry;
use nova_domain::ToolError;

/// Failure while wiring up the tool library.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("failed to register tool: {0}")]
    Registration(#[from] ToolError),
}

/// Registry holding every standard tool, in listing order.
pub fn standard_registry() -> Result<ToolRegistry, SetupError> {
    let mut registry = ToolRegistry::new();
    registry.register(FileReadTool::new())?;
    registry.register(FileWriteTool::new())?;
    registry.register(FileListTool::new())?;
    registry.register(ShellRunTool::new())?;
    #[cfg(feature = "web-tools")]
    registry.register(WebGetTool::new().map_err(|e| SetupError::HttpClient(e.to_string()))?)?;
    registry.register(SysEnvTool::new())?;
    registry.register(SysUsageTool::new())?;
    registry.register(SysInfoTool::new())?;
    registry.register(SandboxExecTool::new())?;
    Ok(registry)
}
