//! Workspace guard: confines every tool-supplied path to the workspace root.
//!
//! Resolution steps:
//!
//! 1. join onto the root (an absolute user path replaces the root and is
//!    checked like any other)
//! 2. normalize `.` and `..` lexically
//! 3. canonicalize the longest existing ancestor, re-append the rest
//! 4. require the result to sit under the canonical root, compared
//!    component-wise so `/ws_evil` is not under `/ws`

use nova_application::ports::path_guard::PathGuard;
use nova_domain::ToolError;
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    root: PathBuf,
}

impl WorkspaceGuard {
    /// Create a guard for an existing directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("workspace root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    fn resolve_path(&self, user_path: &str) -> Option<PathBuf> {
        let joined = self.root.join(user_path);
        let normalized = normalize_lexically(&joined);
        let resolved = canonicalize_existing_prefix(&normalized)?;
        resolved.starts_with(&self.root).then_some(resolved)
    }
}

impl PathGuard for WorkspaceGuard {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, user_path: &str) -> Result<PathBuf, ToolError> {
        match self.resolve_path(user_path) {
            Some(path) => Ok(path),
            None => {
                tracing::debug!(path = %user_path, root = %self.root.display(), "Rejected path outside workspace");
                Err(ToolError::path_escape(user_path))
            }
        }
    }
}

/// Remove `.` and fold `..` without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// not-yet-existing tail.
///
/// Returns `None` when a component is a dangling symlink: its eventual
/// target cannot be checked, so it is treated as an escape.
fn canonicalize_existing_prefix(path: &Path) -> Option<PathBuf> {
    let mut tail: Vec<OsString> = Vec::new();
    let mut current = path;

    loop {
        match current.canonicalize() {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Some(resolved);
            }
            Err(_) => {
                if current.symlink_metadata().is_ok() {
                    return None;
                }
                tail.push(current.file_name()?.to_os_string());
                current = current.parent()?;
            }
        }
    }
}
