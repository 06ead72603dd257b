//! Property-based tests for the state machine
//!
//! Event sequences are driven through a minimal effect interpreter that keeps
//! a transcript, so invariants over the message log can be checked too.

use super::transition::*;
use super::*;
use crate::segmenter::PreamblePolicy;
use crate::transcript::{MessageKind, Role, Transcript};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("Alice", PreamblePolicy::Drop)
}

/// What the fake completion service answers with
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure,
}

/// User-level actions; completion results come from the paired reply
#[derive(Debug, Clone)]
enum Action {
    Start(String),
    Arrive(Reply),
    Send(String, Reply),
}

struct Harness {
    phase: SessionPhase,
    context: SessionContext,
    transcript: Transcript,
    arrivals_completed: usize,
}

impl Harness {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            context: test_context(),
            transcript: Transcript::new(),
            arrivals_completed: 0,
        }
    }

    fn run(&mut self, action: Action) {
        let (event, reply) = match action {
            Action::Start(label) => (Event::Start { user_label: label }, None),
            Action::Arrive(reply) => (Event::Arrive, Some(reply)),
            Action::Send(text, reply) => (Event::UserMessage { text }, Some(reply)),
        };

        let mut next = Some(event);
        while let Some(event) = next.take() {
            let arrival_reply = self.phase == SessionPhase::ArrivalPending
                && matches!(event, Event::CompletionReceived { .. });
            let Ok(result) = transition(&self.phase, &self.context, event) else {
                return;
            };
            if arrival_reply {
                self.arrivals_completed += 1;
            }
            self.phase = result.new_state;
            for effect in result.effects {
                match effect {
                    Effect::BeginSession { user_label } => {
                        self.context.user_label = user_label;
                        self.transcript.clear();
                        self.arrivals_completed = 0;
                    }
                    Effect::AppendUserMessage { text, kind } => {
                        self.transcript.push_user(text, kind);
                    }
                    Effect::AppendUtterances { utterances } => {
                        for u in utterances {
                            self.transcript.push_assistant(u.speaker, u.text);
                        }
                    }
                    Effect::PersistTranscript => {}
                    Effect::RequestCompletion { .. } => {
                        next = Some(match reply.clone() {
                            Some(Reply::Text(text)) => Event::CompletionReceived { text },
                            _ => Event::CompletionFailed,
                        });
                    }
                }
            }
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_phase() -> impl Strategy<Value = SessionPhase> {
    prop_oneof![
        Just(SessionPhase::Uninitialized),
        Just(SessionPhase::AwaitingArrival),
        Just(SessionPhase::ArrivalPending),
        Just(SessionPhase::Ready),
        Just(SessionPhase::Responding),
    ]
}

fn arb_reply() -> impl Strategy<Value = Reply> {
    prop_oneof![
        3 => proptest::collection::vec(("[A-Za-z]{1,8}", "[a-z .!?]{0,20}"), 0..4).prop_map(
            |parts| {
                let text = parts
                    .iter()
                    .map(|(name, line)| format!("[{name}]: {line}"))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                Reply::Text(text)
            }
        ),
        1 => "[a-z ]{0,20}".prop_map(Reply::Text),
        1 => Just(Reply::Failure),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        1 => "[A-Za-z ]{0,10}".prop_map(Action::Start),
        2 => arb_reply().prop_map(Action::Arrive),
        4 => ("[a-z ]{0,20}", arb_reply()).prop_map(|(text, reply)| Action::Send(text, reply)),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[A-Za-z ]{0,10}".prop_map(|user_label| Event::Start { user_label }),
        Just(Event::Arrive),
        "[a-z ]{0,20}".prop_map(|text| Event::UserMessage { text }),
        "[a-z\\[\\]: ]{0,20}".prop_map(|text| Event::CompletionReceived { text }),
        Just(Event::CompletionFailed),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Sequence numbers stay contiguous from zero through any action history
    #[test]
    fn prop_sequences_stay_contiguous(actions in proptest::collection::vec(arb_action(), 0..30)) {
        let mut harness = Harness::new();
        for action in actions {
            harness.run(action);
            for (i, message) in harness.transcript.messages().iter().enumerate() {
                prop_assert_eq!(message.sequence, i as u64);
            }
        }
    }

    // Between action boundaries the session is never mid-call
    #[test]
    fn prop_actions_end_in_resting_phase(actions in proptest::collection::vec(arb_action(), 0..30)) {
        let mut harness = Harness::new();
        for action in actions {
            harness.run(action);
            prop_assert!(!harness.phase.is_busy(), "Busy after action: {:?}", harness.phase);
        }
    }

    // The arrival turn completes at most once per start and opens the transcript
    #[test]
    fn prop_arrival_at_most_once_per_start(actions in proptest::collection::vec(arb_action(), 0..30)) {
        let mut harness = Harness::new();
        for action in actions {
            harness.run(action);
            prop_assert!(harness.arrivals_completed <= 1);
            if let Some(first) = harness.transcript.messages().first() {
                prop_assert_eq!(first.kind, MessageKind::Arrival);
            }
        }
    }

    // No chat message is logged before the group has replied to the arrival
    #[test]
    fn prop_chat_only_after_arrival(actions in proptest::collection::vec(arb_action(), 0..30)) {
        let mut harness = Harness::new();
        for action in actions {
            harness.run(action);
            let messages = harness.transcript.messages();
            if let Some(first_chat) = messages
                .iter()
                .position(|m| m.role == Role::User && m.kind == MessageKind::Chat)
            {
                prop_assert!(first_chat > 0);
            }
        }
    }

    // Start with a non-blank label succeeds from any phase
    #[test]
    fn prop_start_always_available(phase in arb_phase(), label in "[A-Za-z]{1,10}") {
        let result = transition(&phase, &test_context(), Event::Start { user_label: label.clone() });
        prop_assert!(result.is_ok());
        let result = result.unwrap();
        prop_assert_eq!(result.new_state, SessionPhase::AwaitingArrival);
        prop_assert_eq!(
            &result.effects[0],
            &Effect::BeginSession { user_label: label }
        );
    }

    // User messages are accepted only once arrival is done and nothing is in flight
    #[test]
    fn prop_messages_only_when_ready(phase in arb_phase(), text in "[a-z]{1,20}") {
        let result = transition(&phase, &test_context(), Event::UserMessage { text });
        prop_assert_eq!(result.is_ok(), phase == SessionPhase::Ready);
    }

    // Completion results only land while a call is in flight
    #[test]
    fn prop_completions_need_pending_call(phase in arb_phase(), event in arb_event()) {
        let is_completion = matches!(
            event,
            Event::CompletionReceived { .. } | Event::CompletionFailed
        );
        let result = transition(&phase, &test_context(), event);
        if is_completion && !phase.is_busy() {
            prop_assert!(matches!(result, Err(TransitionError::InvalidTransition(_))));
        }
    }

    // A failed call returns to where the action started
    #[test]
    fn prop_failure_restores_resting_phase(phase in arb_phase()) {
        if let Ok(result) = transition(&phase, &test_context(), Event::CompletionFailed) {
            prop_assert!(result.effects.is_empty());
            let expected = match phase {
                SessionPhase::ArrivalPending => SessionPhase::AwaitingArrival,
                _ => SessionPhase::Ready,
            };
            prop_assert_eq!(result.new_state, expected);
        }
    }
}
