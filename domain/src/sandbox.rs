//! Sandbox session state machine.
//!
//! ```text
//! Uninitialized ──start──▶ Starting ──ok──▶ Running ──stop──▶ Stopped
//!       │                     │
//!       └──stop──▶ Stopped    └──err──▶ Failed
//! ```
//!
//! Transitions only move forward. A reset replaces the whole session with a
//! fresh `Uninitialized` one rather than rewinding the state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Uninitialized,
    Starting,
    Running,
    Stopped,
    Failed,
}

impl SandboxState {
    pub fn as_str(&self) -> &str {
        match self {
            SandboxState::Uninitialized => "uninitialized",
            SandboxState::Starting => "starting",
            SandboxState::Running => "running",
            SandboxState::Stopped => "stopped",
            SandboxState::Failed => "failed",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SandboxState::Running)
    }

    /// Terminal states never change again within a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SandboxState::Stopped | SandboxState::Failed)
    }

    /// Whether the session may move from `self` to `next`.
    pub fn can_transition_to(&self, next: SandboxState) -> bool {
        use SandboxState::*;
        matches!(
            (self, next),
            (Uninitialized, Starting)
                | (Uninitialized, Stopped)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopped)
        )
    }
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
