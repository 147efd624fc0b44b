//! Tool schema port
//!
//! Turns tool descriptors into the JSON Schema documents an LLM provider
//! expects in its tool-use API.

use nova_domain::ToolDescriptor;
use serde_json::Value;

use crate::registry::ToolRegistry;

pub trait ToolSchemaPort: Send + Sync {
    /// Schema document for one tool
    fn tool_to_schema(&self, tool: &ToolDescriptor) -> Value;

    /// Schema documents for every registered tool, in registration order
    fn all_tools_schema(&self, registry: &ToolRegistry) -> Vec<Value> {
        registry
            .list()
            .into_iter()
            .map(|tool| self.tool_to_schema(tool))
            .collect()
    }
}
