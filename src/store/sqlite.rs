//! SQLite-backed transcript store

use super::{StoreError, StoreResult, TranscriptStore};
use crate::transcript::{Message, MessageKind, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQL schema for initialization
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS transcript_messages (
    session_key TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    role TEXT NOT NULL,
    speaker TEXT,
    kind TEXT NOT NULL DEFAULT 'chat',
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (session_key, sequence)
);
";

/// Thread-safe database handle
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }
}

#[async_trait]
impl TranscriptStore for SqliteStore {
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sequence, role, speaker, kind, text, created_at
             FROM transcript_messages WHERE session_key = ?1 ORDER BY sequence ASC",
        )?;

        let rows = stmt.query_map(params![key], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM transcript_messages WHERE session_key = ?1",
            params![key],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO transcript_messages (session_key, sequence, role, speaker, kind, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for message in messages {
                insert.execute(params![
                    key,
                    i64::try_from(message.sequence).unwrap_or(i64::MAX),
                    message.role.as_str(),
                    message.speaker,
                    message.kind.as_str(),
                    message.text,
                    message.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(session_key = %key, messages = messages.len(), "Transcript saved");
        Ok(())
    }
}

/// Parse a message row from the database
fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let sequence: i64 = row.get(0)?;
    let role_str: String = row.get(1)?;
    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown role {role_str}").into(),
        )
    })?;

    Ok(Message {
        role,
        speaker: row.get(2)?,
        kind: MessageKind::parse(&row.get::<_, String>(3)?),
        text: row.get(4)?,
        sequence: u64::try_from(sequence).unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Transcript;

    fn sample() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push_user("(System notice: 'Alice' has joined the chat.)", MessageKind::Arrival);
        transcript.push_assistant(Some("Kang Geonu".to_string()), "who's this?");
        transcript.push_assistant(Some("Lee Seoa".to_string()), "a new member, obviously.");
        transcript
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        let transcript = sample();

        store.save("alice", transcript.messages()).await.unwrap();
        let loaded = store.load("alice").await.unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].kind, MessageKind::Arrival);
        assert_eq!(loaded[0].role, Role::User);
        assert_eq!(loaded[1].speaker.as_deref(), Some("Kang Geonu"));
        assert_eq!(loaded[2].sequence, 2);
        assert!(Transcript::restore(loaded).is_ok());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_log() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("alice", sample().messages()).await.unwrap();

        let mut shorter = Transcript::new();
        shorter.push_user("fresh start", MessageKind::Chat);
        store.save("alice", shorter.messages()).await.unwrap();

        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "fresh start");
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("alice", sample().messages()).await.unwrap();
        store.save("bob", &[]).await.unwrap();

        assert!(store.load("bob").await.unwrap().is_empty());
        assert_eq!(store.load("alice").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcripts.db");

        SqliteStore::open(&path)
            .unwrap()
            .save("alice", sample().messages())
            .await
            .unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load("alice").await.unwrap().len(), 3);
    }
}
