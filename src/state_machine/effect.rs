//! Effects produced by state transitions

use crate::segmenter::Utterance;
use crate::transcript::MessageKind;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Clear the transcript, issue a new session id and completion handle
    BeginSession { user_label: String },

    /// Append a user message
    AppendUserMessage { text: String, kind: MessageKind },

    /// Append one assistant message per utterance, in order
    AppendUtterances { utterances: Vec<Utterance> },

    /// Replace the stored transcript with the current one
    PersistTranscript,

    /// Call the completion service; the last transcript entry is the input
    RequestCompletion { next_input: String },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendUserMessage {
            text: text.into(),
            kind: MessageKind::Chat,
        }
    }

    pub fn append_arrival(text: impl Into<String>) -> Self {
        Effect::AppendUserMessage {
            text: text.into(),
            kind: MessageKind::Arrival,
        }
    }
}
