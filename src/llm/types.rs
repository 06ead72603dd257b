//! Common types for completion requests

use serde::Serialize;

/// Completion request: instructions, windowed history, and the next input
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub persona_instructions: String,
    pub history: Vec<CompletionTurn>,
    pub next_input: String,
}

/// One prior turn as the completion service sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionTurn {
    pub role: TurnRole,
    pub text: String,
}

impl CompletionTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Role vocabulary of the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// Raw completion returned by the service
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

impl Completion {
    #[allow(dead_code)] // Used in tests
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
