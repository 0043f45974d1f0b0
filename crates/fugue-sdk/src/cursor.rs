//! Durable log-stream cursors
//!
//! A cursor is the `(lastTick, lastLogId)` watermark a subscription resumes
//! from, keyed by `"scIndex:logType"`. Stores are single-writer per key;
//! writes to different keys must not interfere.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::SdkError;

/// A subscription's resume watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCursor {
    /// Last tick a log was seen for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<u32>,
    /// Last log id seen (preferred over the tick when both exist)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_log_id: Option<u64>,
}

/// The store key for a (contract, log type) pair.
pub fn cursor_key(sc_index: u32, log_type: u32) -> String {
    format!("{sc_index}:{log_type}")
}

/// Pluggable cursor persistence.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Read the cursor for a key, if present.
    async fn get(&self, key: &str) -> Result<Option<LogCursor>, SdkError>;

    /// Write the cursor for a key.
    async fn set(&self, key: &str, cursor: LogCursor) -> Result<(), SdkError>;
}

/// In-memory cursor store (tests, throwaway streams).
#[derive(Default)]
pub struct MemoryCursorStore {
    cursors: Mutex<HashMap<String, LogCursor>>,
}

impl MemoryCursorStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored cursor.
    pub fn snapshot(&self) -> HashMap<String, LogCursor> {
        self.cursors.lock().clone()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn get(&self, key: &str) -> Result<Option<LogCursor>, SdkError> {
        Ok(self.cursors.lock().get(key).copied())
    }

    async fn set(&self, key: &str, cursor: LogCursor) -> Result<(), SdkError> {
        self.cursors.lock().insert(key.to_string(), cursor);
        Ok(())
    }
}

/// JSON-file cursor store with atomic writes (tmp + rename).
pub struct FileCursorStore {
    path: PathBuf,
    cursors: Mutex<HashMap<String, LogCursor>>,
}

impl FileCursorStore {
    /// Open (or initialize) a cursor file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref().to_path_buf();
        let cursors = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            cursors: Mutex::new(cursors),
        })
    }

    fn persist(&self, snapshot: &HashMap<String, LogCursor>) -> Result<(), SdkError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn get(&self, key: &str) -> Result<Option<LogCursor>, SdkError> {
        Ok(self.cursors.lock().get(key).copied())
    }

    async fn set(&self, key: &str, cursor: LogCursor) -> Result<(), SdkError> {
        let snapshot = {
            let mut cursors = self.cursors.lock();
            cursors.insert(key.to_string(), cursor);
            cursors.clone()
        };
        self.persist(&snapshot)
    }
}
