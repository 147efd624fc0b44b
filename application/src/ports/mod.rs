//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod metrics_sink;
pub mod path_guard;
pub mod sandbox;
pub mod tool;
pub mod tool_schema;
