//! Configuration value objects for the domain layer
//!
//! The snapshot here is what the policy gate and tools consult. Loading it
//! from files and environment is an infrastructure concern.

mod tool_config;

pub use tool_config::{
    ConfigError, DEFAULT_SANDBOX_IMAGE, DEFAULT_SANDBOX_RUNTIME, DEFAULT_TOOL_TIMEOUT_SECONDS,
    ToolConfig, ToolConfigBuilder,
};
