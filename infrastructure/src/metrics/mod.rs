//! Metrics persistence: the JSONL implementation of the
//! [`MetricsSink`](nova_application::MetricsSink) port.

mod jsonl_sink;

pub use jsonl_sink::JsonlMetricsSink;
