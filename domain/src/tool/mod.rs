//! Tool domain module
//!
//! Core abstractions for the agent's tools: how a tool is described, how its
//! arguments are declared and validated, and what an invocation returns.
//!
//! ```text
//! ┌────────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ ToolDescriptor │──▶│ ToolCall     │──▶│ Arguments    │──▶│ ToolResult   │
//! │ (schema, caps) │   │ (raw JSON)   │   │ (validated)  │   │ (Ok / Err)   │
//! └────────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Everything in here is pure data plus pure functions. Execution lives in
//! the application layer (`Tool` port, `Dispatcher`) and infrastructure
//! (standard tool library).

pub mod entities;
pub mod schema;
pub mod validation;
pub mod value_objects;

pub use entities::{Capability, ToolCall, ToolDescriptor};
pub use schema::{ParamKind, ParamSpec, Schema};
pub use validation::{ArgumentValidator, Arguments, StrictValidator, validate_arguments};
pub use value_objects::{ErrorBody, ErrorKind, ResultEnvelope, ToolError, ToolOutput, ToolResult};
