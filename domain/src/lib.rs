//! Domain layer for nova-tools
//!
//! This crate contains the pure core of the tool-execution system: tool
//! descriptors and schemas, argument validation, the policy gate, the
//! configuration snapshot and the sandbox state machine.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Descriptor**: what a tool is called, which arguments it takes and
//!   which capabilities it needs
//! - **Validation**: raw JSON arguments → typed [`Arguments`] or `BAD_ARGUMENT`
//! - **Policy**: config + capabilities + arguments → permit / deny
//! - **Result**: every invocation ends in exactly one [`ToolResult`]

pub mod config;
pub mod policy;
pub mod sandbox;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use config::{ConfigError, ToolConfig, ToolConfigBuilder};
pub use policy::PolicyGate;
pub use sandbox::SandboxState;
pub use tool::{
    entities::{Capability, ToolCall, ToolDescriptor},
    schema::{ParamKind, ParamSpec, Schema},
    validation::{ArgumentValidator, Arguments, StrictValidator, validate_arguments},
    value_objects::{ErrorBody, ErrorKind, ResultEnvelope, ToolError, ToolOutput, ToolResult},
};
