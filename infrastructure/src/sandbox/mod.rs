//! Sandbox runner: container session lifecycle and in-container execution.

mod runner;

pub use runner::{ContainerSandbox, SandboxRuntime};
