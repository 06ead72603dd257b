//! Transcript persistence
//!
//! Stores keep one full message log per session key and only support
//! load-all and replace-all. Each implementation applies a replace
//! atomically; writers in different processes may still lose updates.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable transcript log keyed by session
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Load every message stored under `key`; unknown keys are empty
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>>;

    /// Replace everything stored under `key` with `messages`
    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()>;
}

#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()> {
        (**self).save(key, messages).await
    }
}

/// Process-local store; contents vanish on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: Mutex<HashMap<String, Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(logs.get(key).cloned().unwrap_or_default())
    }

    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        logs.insert(key.to_string(), messages.to_vec());
        Ok(())
    }
}
