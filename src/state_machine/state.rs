//! Session state types

use crate::segmenter::PreamblePolicy;
use serde::Serialize;

/// Session phase.
///
/// `ArrivalPending` and `Responding` only exist while a completion call is in
/// flight; a failed call falls back to the resting phase it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No user identity yet
    #[default]
    Uninitialized,

    /// Started; the arrival turn has not run
    AwaitingArrival,

    /// Arrival completion in flight
    ArrivalPending,

    /// Arrival done, accepting user messages
    Ready,

    /// Reply completion in flight
    Responding,
}

impl SessionPhase {
    pub fn arrival_sent(self) -> bool {
        matches!(self, SessionPhase::Ready | SessionPhase::Responding)
    }

    pub fn is_busy(self) -> bool {
        matches!(self, SessionPhase::ArrivalPending | SessionPhase::Responding)
    }

    /// The phase an in-flight call falls back to when it does not complete
    pub fn resting(self) -> Self {
        match self {
            SessionPhase::ArrivalPending => SessionPhase::AwaitingArrival,
            SessionPhase::Responding => SessionPhase::Ready,
            other => other,
        }
    }
}

/// Per-session configuration the transition function reads
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_label: String,
    pub preamble: PreamblePolicy,
}

impl SessionContext {
    pub fn new(user_label: impl Into<String>, preamble: PreamblePolicy) -> Self {
        Self {
            user_label: user_label.into(),
            preamble,
        }
    }
}
