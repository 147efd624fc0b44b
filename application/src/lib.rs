//! Application layer for nova-tools
//!
//! This crate contains the tool ports, the registry, the metrics tap and the
//! dispatch use case. It depends only on the domain layer.

pub mod metrics;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use metrics::{MetricsSummary, MetricsTap};
pub use ports::{
    metrics_sink::{MemoryMetricsSink, MetricsEvent, MetricsEventType, MetricsSink, NoMetricsSink},
    path_guard::PathGuard,
    sandbox::{NoSandbox, SandboxPort},
    tool::{Tool, ToolContext},
    tool_schema::ToolSchemaPort,
};
pub use registry::ToolRegistry;
pub use use_cases::dispatch::{CANCEL_GRACE, Dispatcher, Invocation};
