//! Append-only conversation transcript

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Distinguishes typed user input from the synthetic arrival notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Chat,
    /// Prompt fed to the model when the user joins; hidden from renderers
    Arrival,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::Arrival => "arrival",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "arrival" => MessageKind::Arrival,
            _ => MessageKind::Chat,
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Label extracted by the segmenter; only set on assistant messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub text: String,
    pub sequence: u64,
    #[serde(default)]
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Rendered form for chat bubbles, e.g. `**Mina**: hello`
    pub fn display_text(&self) -> String {
        match &self.speaker {
            Some(speaker) => format!("**{speaker}**: {}", self.text),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Transcript sequence broken at position {position}: found {found}")]
pub struct SequenceError {
    pub position: usize,
    pub found: u64,
}

/// Ordered message log whose sequence numbers run 0, 1, 2, ...
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored messages, rejecting gaps and reordering
    pub fn restore(messages: Vec<Message>) -> Result<Self, SequenceError> {
        for (position, message) in messages.iter().enumerate() {
            if message.sequence != position as u64 {
                return Err(SequenceError {
                    position,
                    found: message.sequence,
                });
            }
        }
        Ok(Self { messages })
    }

    pub fn push_user(&mut self, text: impl Into<String>, kind: MessageKind) -> &Message {
        self.push(Role::User, None, text.into(), kind)
    }

    pub fn push_assistant(&mut self, speaker: Option<String>, text: impl Into<String>) -> &Message {
        self.push(Role::Assistant, speaker, text.into(), MessageKind::Chat)
    }

    fn push(
        &mut self,
        role: Role,
        speaker: Option<String>,
        text: String,
        kind: MessageKind,
    ) -> &Message {
        let sequence = self.messages.len() as u64;
        self.messages.push(Message {
            role,
            speaker,
            text,
            sequence,
            kind,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn assistant_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_contiguous_sequences() {
        let mut transcript = Transcript::new();
        transcript.push_user("(joined)", MessageKind::Arrival);
        transcript.push_assistant(Some("Mina".to_string()), "welcome");
        transcript.push_user("hi", MessageKind::Chat);

        let sequences: Vec<u64> = transcript.messages().iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(transcript.assistant_count(), 1);
    }

    #[test]
    fn test_restore_rejects_gap() {
        let mut transcript = Transcript::new();
        transcript.push_user("a", MessageKind::Chat);
        transcript.push_user("b", MessageKind::Chat);
        let mut messages = transcript.messages().to_vec();
        messages[1].sequence = 5;

        let err = Transcript::restore(messages).unwrap_err();
        assert_eq!(err, SequenceError { position: 1, found: 5 });
    }

    #[test]
    fn test_restore_accepts_valid_log() {
        let mut transcript = Transcript::new();
        transcript.push_user("a", MessageKind::Chat);
        transcript.push_assistant(Some("B".to_string()), "b");

        let restored = Transcript::restore(transcript.messages().to_vec()).unwrap();
        assert_eq!(restored, transcript);
    }

    #[test]
    fn test_display_text_bolds_speaker() {
        let mut transcript = Transcript::new();
        let msg = transcript.push_assistant(Some("Mina".to_string()), "hello").clone();
        assert_eq!(msg.display_text(), "**Mina**: hello");

        let user = transcript.push_user("plain", MessageKind::Chat);
        assert_eq!(user.display_text(), "plain");
    }

    #[test]
    fn test_message_json_roundtrip_keeps_kind() {
        let mut transcript = Transcript::new();
        let msg = transcript.push_user("(joined)", MessageKind::Arrival).clone();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"kind\":\"arrival\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
