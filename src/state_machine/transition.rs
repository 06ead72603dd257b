//! Pure state transition function

use super::{Effect, Event, SessionContext, SessionPhase};
use crate::prompt::arrival_notice;
use crate::segmenter::segment;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionPhase,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionPhase) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("Session has not been started")]
    NotStarted,
    #[error("The group has not noticed you yet (arrival in progress)")]
    ArrivalIncomplete,
    #[error("A reply is already being generated")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &SessionPhase,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (*state, event) {
        // ============================================================
        // Lifecycle
        // ============================================================

        // Start is always available, which makes it double as reset
        (_, Event::Start { user_label }) => {
            let user_label = user_label.trim();
            if user_label.is_empty() {
                return Err(TransitionError::EmptyInput("user label"));
            }
            Ok(TransitionResult::new(SessionPhase::AwaitingArrival)
                .with_effect(Effect::BeginSession {
                    user_label: user_label.to_string(),
                })
                .with_effect(Effect::PersistTranscript))
        }

        // ============================================================
        // Arrival turn
        // ============================================================
        (SessionPhase::AwaitingArrival, Event::Arrive) => {
            let notice = arrival_notice(&context.user_label);
            Ok(TransitionResult::new(SessionPhase::ArrivalPending)
                .with_effect(Effect::append_arrival(notice.clone()))
                .with_effect(Effect::PersistTranscript)
                .with_effect(Effect::RequestCompletion { next_input: notice }))
        }

        // At most once per start: later renders are no-ops
        (SessionPhase::Ready | SessionPhase::Responding, Event::Arrive) => {
            Ok(TransitionResult::new(*state))
        }

        (SessionPhase::ArrivalPending, Event::Arrive) => Err(TransitionError::Busy),

        (SessionPhase::Uninitialized, Event::Arrive) => Err(TransitionError::NotStarted),

        // ============================================================
        // User messages
        // ============================================================
        (_, Event::UserMessage { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyInput("message"))
        }

        (SessionPhase::Ready, Event::UserMessage { text }) => {
            Ok(TransitionResult::new(SessionPhase::Responding)
                .with_effect(Effect::append_user(text.clone()))
                .with_effect(Effect::PersistTranscript)
                .with_effect(Effect::RequestCompletion { next_input: text }))
        }

        (SessionPhase::Uninitialized, Event::UserMessage { .. }) => {
            Err(TransitionError::NotStarted)
        }

        (SessionPhase::AwaitingArrival | SessionPhase::ArrivalPending, Event::UserMessage { .. }) => {
            Err(TransitionError::ArrivalIncomplete)
        }

        (SessionPhase::Responding, Event::UserMessage { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Completion results
        // ============================================================
        (
            SessionPhase::ArrivalPending | SessionPhase::Responding,
            Event::CompletionReceived { text },
        ) => {
            let utterances = segment(&text, context.preamble);
            let result = TransitionResult::new(SessionPhase::Ready);
            if utterances.is_empty() {
                // The group went quiet; nothing to append
                return Ok(result);
            }
            Ok(result
                .with_effect(Effect::AppendUtterances { utterances })
                .with_effect(Effect::PersistTranscript))
        }

        // Failed calls leave the triggering message in place and go back to
        // the phase the action started from
        (
            phase @ (SessionPhase::ArrivalPending | SessionPhase::Responding),
            Event::CompletionFailed,
        ) => Ok(TransitionResult::new(phase.resting())),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}
