//! Metrics tap
//!
//! Wraps every dispatch with structured events appended to a
//! [`MetricsSink`], and keeps an in-process [`MetricsSummary`] of outcomes.
//! Sink failures are swallowed: metrics must never take down a tool call.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use nova_domain::{Arguments, ToolResult};

use crate::ports::metrics_sink::{MetricsEvent, MetricsEventType, MetricsSink, NoMetricsSink};

/// Running totals over all invocations seen by one tap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total: u64,
    pub successful: u64,
    pub total_duration_ms: u64,
}

impl MetricsSummary {
    pub fn failed(&self) -> u64 {
        self.total - self.successful
    }

    /// Fraction of successful invocations, `0.0` before the first one.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64
    }

    pub fn average_duration_ms(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.total as f64
    }
}

pub struct MetricsTap {
    origin: Instant,
    sink: Arc<dyn MetricsSink>,
    summary: MetricsSummary,
}

impl MetricsTap {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            origin: Instant::now(),
            sink,
            summary: MetricsSummary::default(),
        }
    }

    /// Tap that only keeps the summary.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoMetricsSink))
    }

    pub fn summary(&self) -> MetricsSummary {
        self.summary
    }

    /// Record that a permitted tool is about to run.
    ///
    /// Only argument names are recorded, never values.
    pub fn record_invoke(&self, name: &str, args: &Arguments) {
        let mut metadata = Map::new();
        metadata.insert(
            "args".to_string(),
            Value::Array(args.iter().map(|(k, _)| Value::String(k.clone())).collect()),
        );
        self.emit(MetricsEventType::ToolInvoke, name, 0, metadata);
    }

    /// Record the outcome of an invocation. Called exactly once per invoke.
    pub fn record_result(&mut self, name: &str, result: &ToolResult, duration_ms: u64) {
        self.summary.total += 1;
        self.summary.total_duration_ms += duration_ms;
        if result.is_success() {
            self.summary.successful += 1;
        }

        let mut metadata = Map::new();
        metadata.insert("outcome".to_string(), Value::from(result.outcome_tag()));
        metadata.insert("ok".to_string(), Value::Bool(result.is_success()));
        if let Some(error) = result.error() {
            metadata.insert("recoverable".to_string(), Value::Bool(error.recoverable));
        }
        self.emit(MetricsEventType::ToolResult, name, duration_ms, metadata);
    }

    fn emit(
        &self,
        event_type: MetricsEventType,
        name: &str,
        duration_ms: u64,
        metadata: Map<String, Value>,
    ) {
        let event = MetricsEvent {
            ts: self.origin.elapsed().as_millis() as u64,
            event_type,
            name: name.to_string(),
            duration_ms,
            metadata,
        };
        if let Err(e) = self.sink.append(&event) {
            tracing::trace!(event = event_type.as_str(), "Dropped metrics event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::metrics_sink::MemoryMetricsSink;
    use nova_domain::ToolError;

    struct BrokenSink;

    impl MetricsSink for BrokenSink {
        fn append(&self, _event: &MetricsEvent) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_result_event_fields() {
        let sink = Arc::new(MemoryMetricsSink::new());
        let mut tap = MetricsTap::new(sink.clone());

        tap.record_result(
            "file_read",
            &ToolResult::failure(ToolError::not_found("a.txt")),
            4,
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, MetricsEventType::ToolResult);
        assert_eq!(events[0].name, "file_read");
        assert_eq!(events[0].duration_ms, 4);
        assert_eq!(events[0].metadata["outcome"], "NOT_FOUND");
        assert_eq!(events[0].metadata["ok"], false);
    }

    #[test]
    fn test_invoke_records_argument_names_only() {
        let sink = Arc::new(MemoryMetricsSink::new());
        let tap = MetricsTap::new(sink.clone());

        tap.record_invoke("file_write", &Arguments::new().with("content", "secret"));

        let events = sink.events();
        assert_eq!(events[0].metadata["args"], serde_json::json!(["content"]));
        assert!(!serde_json::to_string(&events[0]).unwrap().contains("secret"));
    }

    #[test]
    fn test_broken_sink_is_ignored() {
        let mut tap = MetricsTap::new(Arc::new(BrokenSink));
        tap.record_result("sys_usage", &ToolResult::success("ok"), 1);
        assert_eq!(tap.summary().total, 1);
    }

    #[test]
    fn test_summary() {
        let mut tap = MetricsTap::disabled();
        assert_eq!(tap.summary().success_rate(), 0.0);

        tap.record_result("a", &ToolResult::success("ok"), 10);
        tap.record_result("a", &ToolResult::success("ok"), 20);
        tap.record_result("b", &ToolResult::failure(ToolError::timeout("b")), 30);
        tap.record_result("c", &ToolResult::failure(ToolError::internal("x")), 40);

        let summary = tap.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.success_rate(), 0.5);
        assert_eq!(summary.average_duration_ms(), 25.0);
    }
}
