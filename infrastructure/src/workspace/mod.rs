//! Workspace path confinement.

mod guard;

pub use guard::WorkspaceGuard;
