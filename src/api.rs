//! HTTP API for driving chat sessions
//!
//! A thin JSON layer: each handler locks one session, runs one operation and
//! returns the resulting session view.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::llm::CompletionService;
use crate::roster::Roster;
use crate::session::{ConversationSession, SessionSettings, SharedSession};
use crate::store::TranscriptStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    roster: Arc<Roster>,
    store: Arc<dyn TranscriptStore>,
    completion: Arc<dyn CompletionService>,
    settings: SessionSettings,
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<SharedSession>>>>>,
}

impl AppState {
    pub fn new(
        roster: Arc<Roster>,
        store: Arc<dyn TranscriptStore>,
        completion: Arc<dyn CompletionService>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            roster,
            store,
            completion,
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    fn new_session(&self, key: String) -> SharedSession {
        ConversationSession::new(
            key,
            self.roster.clone(),
            self.store.clone(),
            self.completion.clone(),
            &self.settings,
        )
    }

    /// Register a session, replacing any previous one under the same key
    async fn insert(&self, session: SharedSession) -> Arc<Mutex<SharedSession>> {
        let key = session.key().to_string();
        let session = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(key, session.clone());
        session
    }

    async fn get(&self, key: &str) -> Option<Arc<Mutex<SharedSession>>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Forget a session; its stored transcript stays resumable
    async fn remove(&self, key: &str) -> Option<Arc<Mutex<SharedSession>>> {
        self.sessions.write().await.remove(key)
    }
}
