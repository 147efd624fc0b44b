//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::schema::{ParamSpec, Schema};

/// Coarse permission tag declared by a tool and checked by the policy gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Reads or writes under the workspace
    Filesystem,
    /// Outbound network access
    Network,
    /// Host shell command execution
    Shell,
    /// Execution inside the sandbox container
    Sandbox,
    /// Read-only host introspection (env, usage, OS info)
    Introspection,
}

impl Capability {
    pub fn as_str(&self) -> &str {
        match self {
            Capability::Filesystem => "filesystem",
            Capability::Network => "network",
            Capability::Shell => "shell",
            Capability::Sandbox => "sandbox",
            Capability::Introspection => "introspection",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptor of a tool that can be used by the agent.
///
/// Immutable once the tool is registered. Two descriptors are considered the
/// same registration when name, schema and capabilities all match; the
/// description is display text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "file_read")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Argument schema
    pub schema: Schema,
    /// Capabilities the tool needs
    pub capabilities: BTreeSet<Capability>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: Schema::new(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.schema = self.schema.with_param(param);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether `other` describes the same registration (name + schema + capabilities).
    pub fn same_registration(&self, other: &ToolDescriptor) -> bool {
        self.name == other.name
            && self.schema == other.schema
            && self.capabilities == other.capabilities
    }
}

/// A structured request to run a tool, as emitted by the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    #[serde(alias = "tool", alias = "name")]
    pub tool_name: String,
    /// Raw, not yet validated arguments
    #[serde(default, alias = "args")]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Arguments as a JSON value, the shape the validator consumes.
    pub fn raw_arguments(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}
