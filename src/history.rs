//! History window sent with each completion request
//!
//! Only the most recent turns are sent. Older turns stay in the durable
//! transcript but are never shown to the model again.

use crate::llm::CompletionTurn;
use crate::transcript::{Message, Role};
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_MAX_TURNS: usize = 30;

/// `[Name]:`, `**[Name]**:`, `**[Name]:**`
static BRACKET_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\*\*)?\[[^\]]+\](?:\*\*)?:?(?:\*\*)?\s*").expect("valid regex")
});

/// `**Name**:` and `**Name:**`
static BOLD_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*\*[^*\n]+(?:\*\*:|:\*\*)\s*").expect("valid regex")
});

/// Remove display decoration (speaker prefix, emphasis markers) from a
/// rendered bubble, leaving the plain utterance
pub fn strip_decoration(text: &str) -> String {
    let without_prefix = if let Some(m) = BRACKET_PREFIX_RE.find(text) {
        text.get(m.end()..).unwrap_or_default()
    } else if let Some(m) = BOLD_PREFIX_RE.find(text) {
        text.get(m.end()..).unwrap_or_default()
    } else {
        text
    };

    without_prefix
        .replace("**", "")
        .replace("__", "")
        .trim()
        .to_string()
}

/// Build the completion history from the tail of a transcript.
///
/// Keeps the last `max_turns` messages in oldest-first order and drops any
/// whose cleaned text is empty, so the result may be shorter than
/// `max_turns`.
pub fn build(messages: &[Message], max_turns: usize) -> Vec<CompletionTurn> {
    let start = messages.len().saturating_sub(max_turns);
    messages
        .iter()
        .skip(start)
        .filter_map(|message| {
            let text = strip_decoration(&message.text);
            if text.is_empty() {
                return None;
            }
            Some(match message.role {
                Role::User => CompletionTurn::user(text),
                Role::Assistant => CompletionTurn::model(text),
            })
        })
        .collect()
}
