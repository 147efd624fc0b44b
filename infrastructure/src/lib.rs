//! Infrastructure layer for nova-tools
//!
//! This crate contains the adapters behind the application-layer ports:
//! the workspace guard, the container sandbox runner, the standard tool
//! library, the JSONL metrics sink and configuration file loading.

pub mod config;
pub mod metrics;
pub mod process;
pub mod sandbox;
pub mod tools;
pub mod workspace;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use metrics::JsonlMetricsSink;
pub use sandbox::{ContainerSandbox, SandboxRuntime};
pub use tools::{JsonSchemaToolConverter, SetupError, standard_registry};
pub use workspace::WorkspaceGuard;
