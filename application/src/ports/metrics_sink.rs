//! Port for structured metrics records.
//!
//! Defines the [`MetricsSink`] trait the metrics tap appends to. This is
//! separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures one machine-readable
//! record per dispatch step (e.g. one JSONL line).

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Mutex;

/// Kind of metrics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsEventType {
    /// Emitted right before a permitted tool starts executing
    ToolInvoke,
    /// Emitted exactly once per invocation, whatever the outcome
    ToolResult,
}

impl MetricsEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsEventType::ToolInvoke => "tool_invoke",
            MetricsEventType::ToolResult => "tool_result",
        }
    }
}

/// A single metrics record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsEvent {
    /// Milliseconds since the tap was created (monotonic)
    pub ts: u64,
    #[serde(rename = "type")]
    pub event_type: MetricsEventType,
    /// Tool name as requested by the caller
    pub name: String,
    pub duration_ms: u64,
    pub metadata: Map<String, Value>,
}

/// Port for appending metrics records.
///
/// The tap ignores errors returned here; a broken sink must never fail a
/// tool invocation.
pub trait MetricsSink: Send + Sync {
    /// Record a metrics event.
    fn append(&self, event: &MetricsEvent) -> std::io::Result<()>;
}

/// No-op implementation for when metrics are disabled.
pub struct NoMetricsSink;

impl MetricsSink for NoMetricsSink {
    fn append(&self, _event: &MetricsEvent) -> std::io::Result<()> {
        Ok(())
    }
}

/// In-memory sink, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryMetricsSink {
    events: Mutex<Vec<MetricsEvent>>,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<MetricsEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, event_type: MetricsEventType) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn append(&self, event: &MetricsEvent) -> std::io::Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| std::io::Error::other("metrics buffer poisoned"))?;
        events.push(event.clone());
        Ok(())
    }
}
