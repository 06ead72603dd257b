//! Server configuration read from the environment at startup

use crate::roster::RosterSource;
use crate::segmenter::PreamblePolicy;
use crate::session::SessionSettings;
use crate::store::{JsonFileStore, MemoryStore, SqliteStore, StoreError, TranscriptStore};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which transcript store backs the sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite,
    Json,
}

impl StoreKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub roster: RosterSource,
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub session: SessionSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let data_dir = || {
            let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".persona-room")
        };

        let port = match var("PERSONA_ROOM_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PERSONA_ROOM_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let store = match var("PERSONA_ROOM_STORE") {
            Some(value) => StoreKind::parse(&value).ok_or(ConfigError::Invalid {
                name: "PERSONA_ROOM_STORE",
                value,
            })?,
            None => StoreKind::Sqlite,
        };

        let max_turns = match var("PERSONA_ROOM_HISTORY_TURNS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PERSONA_ROOM_HISTORY_TURNS",
                value,
            })?,
            None => SessionSettings::default().max_turns,
        };

        let preamble = match var("PERSONA_ROOM_PREAMBLE") {
            Some(value) => PreamblePolicy::parse(&value).ok_or(ConfigError::Invalid {
                name: "PERSONA_ROOM_PREAMBLE",
                value,
            })?,
            None => PreamblePolicy::default(),
        };

        Ok(Self {
            port,
            roster: var("PERSONA_ROOM_ROSTER")
                .map_or(RosterSource::BuiltIn, |path| RosterSource::File(path.into())),
            store,
            db_path: var("PERSONA_ROOM_DB_PATH")
                .map_or_else(|| data_dir().join("transcripts.db"), PathBuf::from),
            log_path: var("PERSONA_ROOM_LOG_PATH")
                .map_or_else(|| data_dir().join("transcripts.json"), PathBuf::from),
            session: SessionSettings {
                max_turns,
                preamble,
            },
        })
    }

    /// Open the configured transcript store
    pub fn open_store(&self) -> Result<Arc<dyn TranscriptStore>, StoreError> {
        match self.store {
            StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreKind::Sqlite => {
                if let Some(parent) = self.db_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                tracing::info!(path = %self.db_path.display(), "Opening transcript database");
                Ok(Arc::new(SqliteStore::open(&self.db_path)?))
            }
            StoreKind::Json => {
                tracing::info!(path = %self.log_path.display(), "Using JSON transcript log");
                Ok(Arc::new(JsonFileStore::new(&self.log_path)))
            }
        }
    }
}
