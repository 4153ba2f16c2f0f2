//! JSONL-backed durable store
//!
//! One JSON object per line, append-only, flushed after every write.
//! Opening a store replays the existing log into an in-memory map, so
//! reads never touch the file. Writes serialize a `put` or `delete`
//! record; compaction is simply rewriting the file from the replayed map.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use hivemind_application::{LocalStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogRecord {
    Put {
        key: String,
        value: Value,
        timestamp: String,
    },
    Delete {
        key: String,
        cascade: bool,
        timestamp: String,
    },
}

struct StoreState {
    entries: HashMap<String, Value>,
    writer: BufWriter<File>,
}

/// Durable local store writing an append-only JSONL log
pub struct JsonlStore {
    state: Mutex<StoreState>,
    path: PathBuf,
}

impl JsonlStore {
    /// Open (or create) a store at the given path, replaying any existing log.
    ///
    /// Creates parent directories as needed. Unparseable lines are skipped
    /// with a warning rather than failing the open; a torn final line from
    /// a crash should not brick the store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("create {}: {e}", parent.display())))?;
        }

        let mut entries = HashMap::new();
        if path.exists() {
            let file = File::open(path)
                .map_err(|e| StoreError::Storage(format!("open {}: {e}", path.display())))?;
            for (number, line) in BufReader::new(file).lines().enumerate() {
                let line =
                    line.map_err(|e| StoreError::Storage(format!("read {}: {e}", path.display())))?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LogRecord>(&line) {
                    Ok(LogRecord::Put { key, value, .. }) => {
                        entries.insert(key, value);
                    }
                    Ok(LogRecord::Delete { key, cascade, .. }) => {
                        entries.remove(&key);
                        if cascade {
                            let prefix = format!("{key}:");
                            entries.retain(|k, _| !k.starts_with(&prefix));
                        }
                    }
                    Err(e) => {
                        warn!(path = %path.display(), line = number + 1, error = %e, "skipping unparseable log line");
                    }
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::Storage(format!("append {}: {e}", path.display())))?;

        Ok(Self {
            state: Mutex::new(StoreState {
                entries,
                writer: BufWriter::new(file),
            }),
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resident entry count
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn append(state: &mut StoreState, record: &LogRecord) -> Result<(), StoreError> {
        let line = serde_json::to_string(record)
            .map_err(|e| StoreError::Storage(format!("serialize log record: {e}")))?;
        writeln!(state.writer, "{line}")
            .map_err(|e| StoreError::Storage(format!("append log record: {e}")))?;
        // Flush per write; the log is the durability story
        state
            .writer
            .flush()
            .map_err(|e| StoreError::Storage(format!("flush log: {e}")))
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[async_trait]
impl LocalStore for JsonlStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::append(
            &mut state,
            &LogRecord::Put {
                key: key.to_string(),
                value: value.clone(),
                timestamp: Self::now(),
            },
        )?;
        state.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str, cascade: bool) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::append(
            &mut state,
            &LogRecord::Delete {
                key: key.to_string(),
                cascade,
                timestamp: Self::now(),
            },
        )?;
        state.entries.remove(key);
        if cascade {
            let prefix = format!("{key}:");
            state.entries.retain(|k, _| !k.starts_with(&prefix));
        }
        Ok(())
    }

    async fn apply(&self, entries: &[(String, Value)]) -> Result<(), StoreError> {
        let mut state = self.lock();

        // Serialize everything first so a bad entry aborts before any line lands
        let mut lines = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let record = LogRecord::Put {
                key: key.clone(),
                value: value.clone(),
                timestamp: Self::now(),
            };
            lines.push(
                serde_json::to_string(&record)
                    .map_err(|e| StoreError::TransactionAborted(format!("serialize {key}: {e}")))?,
            );
        }
        for line in &lines {
            writeln!(state.writer, "{line}")
                .map_err(|e| StoreError::TransactionAborted(format!("append batch: {e}")))?;
        }
        state
            .writer
            .flush()
            .map_err(|e| StoreError::TransactionAborted(format!("flush batch: {e}")))?;

        for (key, value) in entries {
            state.entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
