//! Tool Registry
//!
//! The [`ToolRegistry`] maps tool names to [`Tool`] implementations and keeps
//! them in registration order, which is the order listings are shown to the
//! agent.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(FileReadTool::new())?;
//! registry.register(ShellRunTool::new())?;
//!
//! assert!(registry.lookup("file_read").is_some());
//! ```
//!
//! # Duplicate Names
//!
//! Registering a second tool under an existing name fails with
//! `DUPLICATE_NAME`, unless its descriptor is the same registration (name,
//! schema and capabilities all equal). That case is a no-op, so wiring code
//! can safely register the standard library more than once.

use std::collections::HashMap;
use std::sync::Arc;

use nova_domain::{ToolDescriptor, ToolError};

use crate::ports::tool::Tool;

#[derive(Default)]
pub struct ToolRegistry {
    /// Tools in registration order
    tools: Vec<Arc<dyn Tool>>,
    /// Tool name -> index into `tools`
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool (Arc version)
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let descriptor = tool.descriptor();
        if let Some(&existing) = self.index.get(&descriptor.name) {
            if self.tools[existing].descriptor().same_registration(descriptor) {
                tracing::trace!(tool = %descriptor.name, "Tool already registered, skipping");
                return Ok(());
            }
            return Err(ToolError::duplicate_name(&descriptor.name));
        }

        tracing::debug!(
            tool = %descriptor.name,
            capabilities = ?descriptor.capabilities,
            "Registered tool"
        );
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by exact name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in registration order
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.descriptor().name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool::ToolContext;
    use async_trait::async_trait;
    use nova_domain::{Arguments, Capability, ErrorKind, ParamKind, ParamSpec, ToolResult};

    struct StubTool {
        descriptor: ToolDescriptor,
    }

    impl StubTool {
        fn new(name: &str) -> Self {
            Self {
                descriptor: ToolDescriptor::new(name, "stub")
                    .with_param(ParamSpec::required("path", ParamKind::Path, "Path"))
                    .with_capability(Capability::Filesystem),
            }
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
            ToolResult::success("stub")
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("file_read")).unwrap();

        assert!(registry.contains("file_read"));
        assert_eq!(registry.lookup("file_read").unwrap().name(), "file_read");
        assert!(registry.lookup("file_write").is_none());
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["web_get", "file_read", "shell_run"] {
            registry.register(StubTool::new(name)).unwrap();
        }

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, ["web_get", "file_read", "shell_run"]);
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("file_read")).unwrap();
        registry.register(StubTool::new("file_read")).unwrap();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("file_read")).unwrap();

        let mut conflicting = StubTool::new("file_read");
        conflicting.descriptor = conflicting
            .descriptor
            .with_capability(Capability::Network);

        let err = registry.register(conflicting).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateName);
        assert_eq!(registry.len(), 1);
        assert!(!registry.list()[0].requires(Capability::Network));
    }
}
