//! Shared JSON log file
//!
//! All sessions live in one file mapping session key to message list. A save
//! reads the whole file, replaces one entry, and writes the whole file back
//! through a temp file and rename, serialized by an in-process mutex.

use super::{StoreError, StoreResult, TranscriptStore};
use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Log = BTreeMap<String, Vec<Message>>;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[allow(dead_code)] // Diagnostics
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_log(&self) -> StoreResult<Log> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Log::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Log::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_log(&self, log: &Log) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(log)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for JsonFileStore {
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>> {
        let mut log = self.read_log()?;
        Ok(log.remove(key).unwrap_or_default())
    }

    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("log file lock poisoned".to_string()))?;

        let mut log = self.read_log()?;
        log.insert(key.to_string(), messages.to_vec());
        self.write_log(&log)?;

        tracing::debug!(
            path = %self.path.display(),
            session_key = %key,
            messages = messages.len(),
            "Transcript log written"
        );
        Ok(())
    }
}
