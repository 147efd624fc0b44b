//! Immutable tool configuration snapshot
//!
//! A [`ToolConfig`] is built once (from files, env or tests) and handed to
//! every tool through the tool context. Reconfiguring means building a new
//! snapshot and a new dispatcher around it.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SANDBOX_IMAGE: &str = "python:3.9-slim";
pub const DEFAULT_SANDBOX_RUNTIME: &str = "docker";
pub const DEFAULT_TOOL_TIMEOUT_SECONDS: f64 = 30.0;

/// Errors raised while building a [`ToolConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workspace_dir is required")]
    MissingWorkspace,

    #[error("workspace_dir must be an absolute path: {0}")]
    RelativeWorkspace(PathBuf),

    #[error("workspace_dir does not exist or is not a directory: {0}")]
    WorkspaceNotFound(PathBuf),

    #[error("tool_timeout_seconds must be a positive number of seconds")]
    InvalidTimeout,

    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },
}

/// Configuration snapshot consulted by the policy gate and the tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolConfig {
    workspace_dir: PathBuf,
    allow_shell_commands: bool,
    shell_allowlist: Vec<String>,
    sandbox_image: String,
    sandbox_runtime: String,
    tool_timeout_seconds: f64,
    #[serde(skip)]
    tool_timeout: Duration,
    network_allowed: bool,
}

impl ToolConfig {
    pub fn builder(workspace_dir: impl Into<PathBuf>) -> ToolConfigBuilder {
        ToolConfigBuilder::new(workspace_dir)
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn allow_shell_commands(&self) -> bool {
        self.allow_shell_commands
    }

    pub fn shell_allowlist(&self) -> &[String] {
        &self.shell_allowlist
    }

    pub fn is_allowlisted(&self, program: &str) -> bool {
        self.shell_allowlist.iter().any(|p| p == program)
    }

    pub fn sandbox_image(&self) -> &str {
        &self.sandbox_image
    }

    pub fn sandbox_runtime(&self) -> &str {
        &self.sandbox_runtime
    }

    pub fn tool_timeout_seconds(&self) -> f64 {
        self.tool_timeout_seconds
    }

    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    pub fn network_allowed(&self) -> bool {
        self.network_allowed
    }
}

/// Builder for [`ToolConfig`]; defaults match the documented config defaults.
#[derive(Debug, Clone)]
pub struct ToolConfigBuilder {
    workspace_dir: PathBuf,
    allow_shell_commands: bool,
    shell_allowlist: Vec<String>,
    sandbox_image: String,
    sandbox_runtime: String,
    tool_timeout_seconds: f64,
    network_allowed: bool,
}

impl ToolConfigBuilder {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            allow_shell_commands: false,
            shell_allowlist: Vec::new(),
            sandbox_image: DEFAULT_SANDBOX_IMAGE.to_string(),
            sandbox_runtime: DEFAULT_SANDBOX_RUNTIME.to_string(),
            tool_timeout_seconds: DEFAULT_TOOL_TIMEOUT_SECONDS,
            network_allowed: true,
        }
    }

    pub fn allow_shell_commands(mut self, allow: bool) -> Self {
        self.allow_shell_commands = allow;
        self
    }

    pub fn shell_allowlist<I, S>(mut self, programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shell_allowlist = programs.into_iter().map(Into::into).collect();
        self
    }

    pub fn sandbox_image(mut self, image: impl Into<String>) -> Self {
        self.sandbox_image = image.into();
        self
    }

    pub fn sandbox_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.sandbox_runtime = runtime.into();
        self
    }

    pub fn tool_timeout_seconds(mut self, seconds: f64) -> Self {
        self.tool_timeout_seconds = seconds;
        self
    }

    pub fn network_allowed(mut self, allowed: bool) -> Self {
        self.network_allowed = allowed;
        self
    }

    /// Validate and freeze the snapshot.
    ///
    /// Only checks that need no I/O happen here; the loader verifies that
    /// the workspace directory exists.
    pub fn build(self) -> Result<ToolConfig, ConfigError> {
        if self.workspace_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingWorkspace);
        }
        if !self.workspace_dir.is_absolute() {
            return Err(ConfigError::RelativeWorkspace(self.workspace_dir));
        }
        if self.tool_timeout_seconds.is_nan() || self.tool_timeout_seconds <= 0.0 {
            return Err(ConfigError::InvalidTimeout);
        }
        let tool_timeout = Duration::try_from_secs_f64(self.tool_timeout_seconds)
            .map_err(|_| ConfigError::InvalidTimeout)?;
        if self.sandbox_image.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "sandbox_image",
            });
        }
        if self.sandbox_runtime.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "sandbox_runtime",
            });
        }

        Ok(ToolConfig {
            workspace_dir: self.workspace_dir,
            allow_shell_commands: self.allow_shell_commands,
            shell_allowlist: self.shell_allowlist,
            sandbox_image: self.sandbox_image,
            sandbox_runtime: self.sandbox_runtime,
            tool_timeout_seconds: self.tool_timeout_seconds,
            tool_timeout,
            network_allowed: self.network_allowed,
        })
    }
}
