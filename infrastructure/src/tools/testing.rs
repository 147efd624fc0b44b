//! Shared fixture for tool tests: a temp workspace plus a ready context.

use nova_application::ports::path_guard::PathGuard;
use nova_application::{NoSandbox, ToolContext};
use nova_domain::{ToolConfig, ToolConfigBuilder};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::workspace::WorkspaceGuard;

pub(crate) struct Harness {
    pub _dir: tempfile::TempDir,
    pub config: ToolConfig,
    pub guard: WorkspaceGuard,
    pub sandbox: NoSandbox,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|builder| builder)
    }

    pub fn with_config(configure: impl FnOnce(ToolConfigBuilder) -> ToolConfigBuilder) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        let config = configure(ToolConfig::builder(guard.root())).build().unwrap();
        Self {
            _dir: dir,
            config,
            guard,
            sandbox: NoSandbox::new(),
        }
    }

    pub fn ctx(&self) -> ToolContext<'_> {
        self.ctx_with_cancel(CancellationToken::new())
    }

    pub fn ctx_with_cancel(&self, cancel: CancellationToken) -> ToolContext<'_> {
        ToolContext {
            config: &self.config,
            workspace: &self.guard,
            sandbox: &self.sandbox,
            cancel,
        }
    }

    /// Absolute path of `relative` inside the workspace.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.guard.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}
