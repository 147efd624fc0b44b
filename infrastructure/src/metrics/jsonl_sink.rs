//! JSONL file writer for metrics events.
//!
//! Each [`MetricsEvent`] becomes one JSON line carrying the event fields plus
//! a wall-clock `timestamp`. The file is opened in append mode, so metrics
//! from successive runs accumulate.

use nova_application::{MetricsEvent, MetricsSink};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record and
/// on `Drop`.
pub struct JsonlMetricsSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlMetricsSink {
    /// Open (or create) the metrics file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!(path = %path.display(), "Metrics sink opened");
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonlMetricsSink {
    fn append(&self, event: &MetricsEvent) -> io::Result<()> {
        let mut record = match serde_json::to_value(event)? {
            Value::Object(map) => map,
            _ => return Err(io::Error::other("metrics event is not a JSON object")),
        };
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        record.insert("timestamp".to_string(), Value::String(timestamp));

        let line = serde_json::to_string(&record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("metrics writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

impl Drop for JsonlMetricsSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_application::MetricsEventType;
    use serde_json::Map;

    fn event(event_type: MetricsEventType, name: &str) -> MetricsEvent {
        let mut metadata = Map::new();
        metadata.insert("outcome".to_string(), Value::from("ok"));
        MetricsEvent {
            ts: 7,
            event_type,
            name: name.to_string(),
            duration_ms: 12,
            metadata,
        }
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/metrics.jsonl");
        let sink = JsonlMetricsSink::open(&path).unwrap();

        sink.append(&event(MetricsEventType::ToolInvoke, "file_read"))
            .unwrap();
        sink.append(&event(MetricsEventType::ToolResult, "file_read"))
            .unwrap();

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "tool_invoke");
        assert_eq!(records[1]["type"], "tool_result");
        assert_eq!(records[1]["name"], "file_read");
        assert_eq!(records[1]["ts"], 7);
        assert_eq!(records[1]["duration_ms"], 12);
        assert_eq!(records[1]["metadata"]["outcome"], "ok");

        let ts = records[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");

        {
            let sink = JsonlMetricsSink::open(&path).unwrap();
            sink.append(&event(MetricsEventType::ToolResult, "a")).unwrap();
        }
        {
            let sink = JsonlMetricsSink::open(&path).unwrap();
            sink.append(&event(MetricsEventType::ToolResult, "b")).unwrap();
        }

        let names: Vec<String> = read_lines(&path)
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_open_fails_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlMetricsSink::open(dir.path()).is_err());
    }
}
