//! JSONL file writer for orchestration events.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying `type`,
//! `timestamp`, a per-run `seq` number and, when set, the `run_id`.

use chrono::SecondsFormat;
use hypoloop_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

struct Writer {
    out: BufWriter<File>,
    seq: u64,
}

/// Thread-safe via `Mutex`; every line is flushed as it is written.
pub struct JsonlConversationLogger {
    writer: Mutex<Writer>,
    path: PathBuf,
    run_id: Option<String>,
}

impl JsonlConversationLogger {
    /// Create (or truncate) the log file, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Append to an existing log, e.g. when resuming a run.
    pub fn append(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, append: bool) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;

        Ok(Self {
            writer: Mutex::new(Writer {
                out: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
            run_id: None,
        })
    }

    /// Tag every record with this run id
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: ConversationEvent, seq: u64) -> Value {
        // Object payloads are flattened into the record; anything else goes under `data`
        let mut record = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::from(event.event_type));
        record.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("seq".to_string(), Value::from(seq));
        if let Some(run_id) = &self.run_id {
            record.insert("run_id".to_string(), Value::from(run_id.as_str()));
        }
        Value::Object(record)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        writer.seq += 1;
        let record = self.record(event, writer.seq);

        let result = serde_json::to_writer(&mut writer.out, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| {
                writeln!(writer.out)?;
                writer.out.flush()
            });
        if let Err(e) = result {
            warn!("Failed to write to {}: {}", self.path.display(), e);
        }
    }
}
