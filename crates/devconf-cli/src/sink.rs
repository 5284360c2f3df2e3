//! Console state sink: prints each dispatched state and optionally mirrors it
//! to a file.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use devconf_model::SerializedState;
use devconf_runtime::{RuntimeError, StateSink};
use serde_json::Value;

pub struct ConsoleSink {
    dump_path: Option<PathBuf>,
    sent: usize,
}

impl ConsoleSink {
    pub fn new(dump_path: Option<PathBuf>) -> Self {
        Self { dump_path, sent: 0 }
    }

    /// Number of states dispatched so far.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl StateSink for ConsoleSink {
    fn send_state(&mut self, topic: &str, state: &SerializedState) -> Result<(), RuntimeError> {
        if let Some(path) = &self.dump_path {
            fs::write(path, state.as_str()).map_err(|e| {
                RuntimeError::Dispatch(format!("write {}: {}", path.display(), e))
            })?;
        }
        self.sent += 1;

        let res_info = serde_json::from_str::<Value>(state.as_str())
            .ok()
            .and_then(|v| v.get("res_info").cloned())
            .unwrap_or(Value::Null);
        let code = res_info.get("code").and_then(Value::as_u64).unwrap_or(0);
        let marker = if code == 0 { "✓".green() } else { "✗".red() };
        println!(
            "  {} state → {} (res_id {}, code {}) {}",
            marker,
            topic.bold(),
            res_info
                .get("res_id")
                .and_then(Value::as_str)
                .unwrap_or("")
                .yellow(),
            code,
            res_info
                .get("detail_msg")
                .and_then(Value::as_str)
                .unwrap_or("")
                .dimmed()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devconf_model::DeviceContext;

    #[test]
    fn dump_file_receives_state() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("state.json");
        let mut sink = ConsoleSink::new(Some(path.clone()));

        let state = DeviceContext::new().serialize().expect("serialize");
        sink.send_state("edge_app", &state).expect("send");

        assert_eq!(sink.sent(), 1);
        let written = std::fs::read_to_string(&path).expect("read");
        let value: Value = serde_json::from_str(written.trim_end_matches('\0')).expect("json");
        assert!(value.get("res_info").is_some());
    }

    #[test]
    fn unwritable_dump_path_is_a_dispatch_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("missing").join("state.json");
        let mut sink = ConsoleSink::new(Some(path));

        let state = DeviceContext::new().serialize().expect("serialize");
        let err = sink.send_state("edge_app", &state).unwrap_err();
        assert!(matches!(err, RuntimeError::Dispatch(_)));
        assert_eq!(sink.sent(), 0);
    }
}
