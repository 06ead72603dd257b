//! API request and response types

use crate::llm::CompletionService;
use crate::roster::Persona;
use crate::session::{ConversationSession, SessionError};
use crate::state_machine::SessionPhase;
use crate::store::TranscriptStore;
use crate::transcript::{Message, MessageKind, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create or resume a session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_label: String,
    /// Existing key to resume; a new key is issued when absent
    #[serde(default)]
    pub key: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Request to reset a session, optionally under a new label
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub user_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub personas: Vec<Persona>,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub presets: Vec<&'static str>,
}

/// One transcript entry as a front end sees it
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub sequence: u64,
    pub role: Role,
    pub kind: MessageKind,
    pub speaker: Option<String>,
    pub text: String,
    /// Ready-made bubble text for persona messages
    pub display: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            sequence: message.sequence,
            role: message.role,
            kind: message.kind,
            speaker: message.speaker.clone(),
            text: message.text.clone(),
            display: (message.role == Role::Assistant).then(|| message.display_text()),
            created_at: message.created_at,
        }
    }
}

/// Snapshot of one session
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub key: String,
    pub user_label: String,
    pub phase: SessionPhase,
    pub arrival_sent: bool,
    pub active_session_id: Uuid,
    pub storage_degraded: bool,
    pub messages: Vec<MessageView>,
}

impl SessionView {
    pub fn of<S: TranscriptStore, C: CompletionService>(
        session: &ConversationSession<S, C>,
    ) -> Self {
        Self {
            key: session.key().to_string(),
            user_label: session.user_label().to_string(),
            phase: session.phase(),
            arrival_sent: session.arrival_sent(),
            active_session_id: session.active_session_id(),
            storage_degraded: session.storage_degraded(),
            messages: session.messages().iter().map(MessageView::from).collect(),
        }
    }
}

/// Result of an operation that may append persona messages
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub appended: usize,
    pub session: SessionView,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retryable: None,
        }
    }
}

impl From<&SessionError> for ErrorResponse {
    fn from(e: &SessionError) -> Self {
        let retryable = match e {
            SessionError::Completion(cause) => Some(cause.kind.is_retryable()),
            _ => None,
        };
        Self {
            error: e.to_string(),
            retryable,
        }
    }
}
