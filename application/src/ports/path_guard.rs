//! Workspace path confinement port.

use nova_domain::ToolError;
use std::path::{Path, PathBuf};

/// Resolves user-supplied paths against the workspace root.
pub trait PathGuard: Send + Sync {
    /// Canonical workspace root
    fn root(&self) -> &Path;

    /// Absolute path under the root, or `Err(PathEscape)`.
    ///
    /// The target itself need not exist yet.
    fn resolve(&self, user_path: &str) -> Result<PathBuf, ToolError>;

    /// Path relative to the root, for display in tool output.
    fn display_path<'p>(&self, resolved: &'p Path) -> &'p Path {
        resolved.strip_prefix(self.root()).unwrap_or(resolved)
    }
}
