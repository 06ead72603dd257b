//! Events that drive a session

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Start { user_label: String },
    Arrive,
    UserMessage { text: String },

    // Completion events
    CompletionReceived { text: String },
    CompletionFailed,
}
