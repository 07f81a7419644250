//! Append-only JSON Lines event sink.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Mutex;

use super::{EventSink, ObservabilityEvent, SinkError};
use crate::domain::session::SessionId;

/// Writes one JSON object per line to a file opened in append mode.
#[derive(Debug)]
pub struct JsonlEventLog {
    file: Mutex<File>,
}

impl JsonlEventLog {
    /// Open (or create) `path` for appending. Parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Read back the events of one session from a log file.
    ///
    /// Lines that do not parse are skipped with a warning.
    pub fn read_session(
        path: impl AsRef<Path>,
        session_id: &SessionId,
    ) -> std::result::Result<Vec<ObservabilityEvent>, SinkError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut events = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ObservabilityEvent>(&line) {
                Ok(event) if &event.session_id == session_id => events.push(event),
                Ok(_) => {}
                Err(e) => tracing::warn!(line = lineno + 1, error = %e, "skipping malformed event line"),
            }
        }
        Ok(events)
    }
}

impl EventSink for JsonlEventLog {
    fn append(&self, event: &ObservabilityEvent) -> std::result::Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = self.file.lock().map_err(|_| SinkError::Poisoned)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}
