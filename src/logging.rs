use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogSink {
    #[default]
    Disabled,
    Stderr,
    File(PathBuf),
}

/// JSON-lines event log. Write failures are dropped; logging never fails a
/// reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileLog {
    sink: LogSink,
}

impl ReconcileLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn stderr() -> Self {
        Self {
            sink: LogSink::Stderr,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: LogSink::File(path.into()),
        }
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn debug(&self, event: &str, message: &str) {
        self.append("debug", event, message);
    }

    pub fn info(&self, event: &str, message: &str) {
        self.append("info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.append("warn", event, message);
    }

    pub fn append(&self, level: &str, event: &str, message: &str) {
        if self.sink == LogSink::Disabled {
            return;
        }
        let Some(line) = format_log_line(level, event, message) else {
            return;
        };

        match &self.sink {
            LogSink::Disabled => {}
            LogSink::Stderr => {
                let _ = writeln!(std::io::stderr().lock(), "{line}");
            }
            LogSink::File(path) => {
                if let Some(parent) = path.parent() {
                    if fs::create_dir_all(parent).is_err() {
                        return;
                    }
                }
                let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path)
                else {
                    return;
                };
                let _ = writeln!(file, "{line}");
            }
        }
    }
}

pub fn format_log_line(level: &str, event: &str, message: &str) -> Option<String> {
    let payload = serde_json::json!({
        "timestamp": chrono::Utc::now().timestamp(),
        "level": level,
        "event": event,
        "message": message,
    });
    serde_json::to_string(&payload).ok()
}
