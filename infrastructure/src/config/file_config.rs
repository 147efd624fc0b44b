//! Raw TOML configuration data types
//!
//! These structs mirror the config file layout. They are deserialized as-is
//! and turned into the immutable domain snapshot by
//! [`FileConfig::into_snapshot`].

use nova_domain::config::{
    ConfigError, DEFAULT_SANDBOX_IMAGE, DEFAULT_SANDBOX_RUNTIME, DEFAULT_TOOL_TIMEOUT_SECONDS,
};
use nova_domain::ToolConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("tools.workspace_dir is not set")]
    MissingWorkspace,

    #[error("workspace is not a directory: {}", .0.display())]
    WorkspaceNotDirectory(PathBuf),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Raw `[tools]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// Absolute path all file tools are confined to
    pub workspace_dir: Option<PathBuf>,
    pub allow_shell_commands: bool,
    /// Program names `shell_run` may start
    pub shell_allowlist: Vec<String>,
    pub sandbox_image: String,
    /// Container CLI, e.g. `docker` or `podman`
    pub sandbox_runtime: String,
    /// Seconds, fractions allowed
    pub tool_timeout_seconds: f64,
    pub network_allowed: bool,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            allow_shell_commands: false,
            shell_allowlist: Vec::new(),
            sandbox_image: DEFAULT_SANDBOX_IMAGE.to_string(),
            sandbox_runtime: DEFAULT_SANDBOX_RUNTIME.to_string(),
            tool_timeout_seconds: DEFAULT_TOOL_TIMEOUT_SECONDS,
            network_allowed: true,
        }
    }
}

/// Raw `[metrics]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetricsConfig {
    pub enabled: bool,
    /// JSONL output file; defaults to `<data_dir>/nova/metrics.jsonl`
    pub path: Option<PathBuf>,
}

impl Default for FileMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl FileMetricsConfig {
    /// Where metrics go, or `None` when disabled or no data dir is known.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.path.clone().or_else(default_metrics_path)
    }
}

pub fn default_metrics_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("nova").join("metrics.jsonl"))
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tools: FileToolsConfig,
    pub metrics: FileMetricsConfig,
}

impl FileConfig {
    /// Validate and freeze the `[tools]` section into a snapshot.
    ///
    /// The workspace directory must exist.
    pub fn into_snapshot(self) -> Result<ToolConfig, ConfigValidationError> {
        let tools = self.tools;
        let workspace = tools
            .workspace_dir
            .ok_or(ConfigValidationError::MissingWorkspace)?;

        let snapshot = ToolConfig::builder(workspace)
            .allow_shell_commands(tools.allow_shell_commands)
            .shell_allowlist(tools.shell_allowlist)
            .sandbox_image(tools.sandbox_image)
            .sandbox_runtime(tools.sandbox_runtime)
            .tool_timeout_seconds(tools.tool_timeout_seconds)
            .network_allowed(tools.network_allowed)
            .build()?;

        let workspace = snapshot.workspace_dir();
        match std::fs::metadata(workspace) {
            Ok(meta) if meta.is_dir() => Ok(snapshot),
            Ok(_) => Err(ConfigValidationError::WorkspaceNotDirectory(
                workspace.to_path_buf(),
            )),
            Err(_) => Err(ConfigError::WorkspaceNotFound(workspace.to_path_buf()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_workspace(path: impl Into<PathBuf>) -> FileConfig {
        let mut config = FileConfig::default();
        config.tools.workspace_dir = Some(path.into());
        config
    }

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert!(!config.tools.allow_shell_commands);
        assert!(config.tools.shell_allowlist.is_empty());
        assert_eq!(config.tools.sandbox_image, "python:3.9-slim");
        assert_eq!(config.tools.tool_timeout_seconds, 30.0);
        assert!(config.tools.network_allowed);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: FileConfig = toml::from_str(
            r#"
            [tools]
            workspace_dir = "/srv/ws"
            allow_shell_commands = true
            shell_allowlist = ["ls", "cat"]

            [metrics]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.workspace_dir, Some(PathBuf::from("/srv/ws")));
        assert_eq!(config.tools.shell_allowlist, ["ls", "cat"]);
        assert_eq!(config.tools.tool_timeout_seconds, 30.0);
        assert_eq!(config.metrics.resolved_path(), None);
    }

    #[test]
    fn test_into_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = with_workspace(dir.path()).into_snapshot().unwrap();
        assert_eq!(snapshot.workspace_dir(), dir.path());
        assert_eq!(snapshot.sandbox_runtime(), "docker");
    }

    #[test]
    fn test_snapshot_requires_workspace() {
        let err = FileConfig::default().into_snapshot().unwrap_err();
        assert!(matches!(err, ConfigValidationError::MissingWorkspace));
    }

    #[test]
    fn test_snapshot_rejects_missing_workspace() {
        let err = with_workspace("/definitely/not/here/nova-ws")
            .into_snapshot()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::Invalid(ConfigError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_relative_workspace() {
        let err = with_workspace("relative/ws").into_snapshot().unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::Invalid(ConfigError::RelativeWorkspace(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = with_workspace(dir.path());
        config.tools.tool_timeout_seconds = 0.0;

        let err = config.into_snapshot().unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::Invalid(ConfigError::InvalidTimeout)
        ));
    }

    #[test]
    fn test_snapshot_rejects_file_workspace() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = with_workspace(file.path()).into_snapshot().unwrap_err();
        assert!(matches!(err, ConfigValidationError::WorkspaceNotDirectory(_)));
    }

    #[test]
    fn test_metrics_path_override() {
        let metrics = FileMetricsConfig {
            enabled: true,
            path: Some(PathBuf::from("/tmp/m.jsonl")),
        };
        assert_eq!(metrics.resolved_path(), Some(PathBuf::from("/tmp/m.jsonl")));
    }
}
