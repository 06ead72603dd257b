//! Persona instruction construction
//!
//! Renders the instruction payload that binds the completion service to a
//! roster and to the identity the user chose when joining.

use crate::roster::Roster;

/// Ground rules for voicing the cast
const RULES: &str = r#"You play every character listed below at the same time, inside one group chat.
On each turn, have 2 to 4 of them join the conversation naturally, reacting to the user's role.
Write only lines of the form "[Name]: line". No narration or stage directions. Use casual spoken language."#;

/// Suggested identities offered to the user before joining
pub const ROLE_PRESETS: &[&str] = &[
    "a clueless new club member",
    "a mysterious hacker",
    "a ghost nobody can talk to",
];

/// Build the persona instructions for one user identity
pub fn build_persona_instructions(roster: &Roster, user_label: &str) -> String {
    format!(
        "[Rules]: {RULES}\n\n[Characters]:\n{}\n\n[User]: The user is **'{}'**.",
        roster.text().trim_end(),
        user_label.trim()
    )
}

/// Synthetic input fed to the model when the user enters the room
pub fn arrival_notice(user_label: &str) -> String {
    format!("(System notice: '{}' has joined the chat.)", user_label.trim())
}
