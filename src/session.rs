//! Conversation session runtime
//!
//! Owns one user's session state, feeds events through the pure transition
//! function and executes the resulting effects against the transcript store
//! and the completion service.

#[cfg(test)]
pub mod testing;

use crate::history;
use crate::llm::{CompletionRequest, CompletionService, LlmError};
use crate::prompt::build_persona_instructions;
use crate::roster::Roster;
use crate::segmenter::PreamblePolicy;
use crate::state_machine::{
    transition, Effect, Event, SessionContext, SessionPhase, TransitionError,
};
use crate::store::TranscriptStore;
use crate::transcript::{Message, Transcript};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers of session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotReady(String),
    #[error("Completion failed: {0}")]
    Completion(#[source] LlmError),
}

impl From<TransitionError> for SessionError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::EmptyInput(_) => SessionError::Validation(e.to_string()),
            TransitionError::NotStarted
            | TransitionError::ArrivalIncomplete
            | TransitionError::Busy
            | TransitionError::InvalidTransition(_) => SessionError::NotReady(e.to_string()),
        }
    }
}

/// Tunables shared by every session in a process
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_turns: usize,
    pub preamble: PreamblePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_turns: history::DEFAULT_MAX_TURNS,
            preamble: PreamblePolicy::default(),
        }
    }
}

/// Completion configuration bound to one start of a session.
///
/// Rebuilt on every start, so the session id always names the identity the
/// instructions were rendered for.
struct CompletionHandle {
    session_id: Uuid,
    persona_instructions: String,
}

/// Puts an in-flight phase back to rest unless the call was seen through.
///
/// A completion future can be dropped mid-call (e.g. the HTTP client went
/// away); the session must then look as if the call failed.
struct InFlight<'a> {
    phase: &'a mut SessionPhase,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(phase: &'a mut SessionPhase) -> Self {
        Self {
            phase,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled && self.phase.is_busy() {
            tracing::warn!(phase = ?self.phase, "Completion call abandoned");
            *self.phase = self.phase.resting();
        }
    }
}

/// Production session type used by the HTTP layer
pub type SharedSession = ConversationSession<Arc<dyn TranscriptStore>, Arc<dyn CompletionService>>;

/// One user's chat session
pub struct ConversationSession<S, C>
where
    S: TranscriptStore,
    C: CompletionService,
{
    key: String,
    context: SessionContext,
    phase: SessionPhase,
    transcript: Transcript,
    handle: Option<CompletionHandle>,
    max_turns: usize,
    /// Set once a save fails; the session keeps going in memory
    storage_degraded: bool,
    roster: Arc<Roster>,
    store: S,
    completion: C,
}

impl<S, C> ConversationSession<S, C>
where
    S: TranscriptStore,
    C: CompletionService,
{
    pub fn new(
        key: impl Into<String>,
        roster: Arc<Roster>,
        store: S,
        completion: C,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            key: key.into(),
            context: SessionContext::new(String::new(), settings.preamble),
            phase: SessionPhase::Uninitialized,
            transcript: Transcript::new(),
            handle: None,
            max_turns: settings.max_turns,
            storage_degraded: false,
            roster,
            store,
            completion,
        }
    }

    // ============================================================
    // Operations
    // ============================================================

    /// Begin a fresh session as `user_label`, discarding the stored transcript
    pub async fn start(&mut self, user_label: &str) -> Result<(), SessionError> {
        self.dispatch(Event::Start {
            user_label: user_label.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Run the arrival turn if it has not run since the last start.
    ///
    /// Returns the number of persona messages appended.
    pub async fn ensure_arrival(&mut self) -> Result<usize, SessionError> {
        self.dispatch(Event::Arrive).await
    }

    /// Send one user message and append the group's reply.
    ///
    /// Returns the number of persona messages appended.
    pub async fn send(&mut self, text: &str) -> Result<usize, SessionError> {
        self.dispatch(Event::UserMessage {
            text: text.to_string(),
        })
        .await
    }

    /// Start over under the current label
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        let label = self.context.user_label.clone();
        self.start(&label).await
    }

    /// Start over under a new label
    pub async fn reset_as(&mut self, user_label: &str) -> Result<(), SessionError> {
        self.start(user_label).await
    }

    /// Pick up the transcript stored under this session's key.
    ///
    /// A non-empty transcript resumes with arrival already done; an empty
    /// or unreadable one behaves like [`Self::start`].
    pub async fn resume(&mut self, user_label: &str) -> Result<(), SessionError> {
        let user_label = user_label.trim();
        if user_label.is_empty() {
            return Err(TransitionError::EmptyInput("user label").into());
        }

        let stored = match self.store.load(&self.key).await {
            Ok(messages) => Transcript::restore(messages).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let transcript = match stored {
            Ok(transcript) if !transcript.is_empty() => transcript,
            Ok(_) => return self.start(user_label).await,
            Err(error) => {
                tracing::warn!(session_key = %self.key, %error, "Stored transcript unusable, starting fresh");
                return self.start(user_label).await;
            }
        };

        self.begin_session(user_label.to_string());
        self.transcript = transcript;
        self.phase = SessionPhase::Ready;
        tracing::info!(
            session_key = %self.key,
            session_id = %self.active_session_id(),
            messages = self.transcript.len(),
            "Session resumed"
        );
        Ok(())
    }

    // ============================================================
    // Accessors
    // ============================================================

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn user_label(&self) -> &str {
        &self.context.user_label
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn arrival_sent(&self) -> bool {
        self.phase.arrival_sent()
    }

    /// Id issued by the latest start or resume; nil before the first one
    pub fn active_session_id(&self) -> Uuid {
        self.handle.as_ref().map_or(Uuid::nil(), |h| h.session_id)
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn storage_degraded(&self) -> bool {
        self.storage_degraded
    }

    // ============================================================
    // Event processing
    // ============================================================

    /// Feed one event through the state machine, chaining the completion
    /// result back in. Returns the number of assistant messages appended.
    async fn dispatch(&mut self, event: Event) -> Result<usize, SessionError> {
        // Only reachable when an earlier call was dropped before its
        // completion landed, e.g. while persisting the triggering message
        if self.phase.is_busy() {
            tracing::warn!(session_key = %self.key, phase = ?self.phase, "Recovering abandoned call");
            self.phase = self.phase.resting();
        }

        let assistant_before = self.transcript.assistant_count();
        let mut failure: Option<LlmError> = None;
        let mut next = Some(event);

        while let Some(event) = next.take() {
            let result = transition(&self.phase, &self.context, event)?;
            self.phase = result.new_state;

            for effect in result.effects {
                if let Effect::RequestCompletion { next_input } = effect {
                    let outcome = match self.completion_request(next_input) {
                        Ok(request) => {
                            let in_flight = InFlight::new(&mut self.phase);
                            let outcome = self.completion.complete(&request).await;
                            in_flight.settle();
                            outcome
                        }
                        Err(e) => Err(e),
                    };
                    next = Some(match outcome {
                        Ok(completion) => {
                            if completion.text.trim().is_empty() {
                                tracing::info!(session_key = %self.key, "The group went quiet");
                            }
                            Event::CompletionReceived {
                                text: completion.text,
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            Event::CompletionFailed
                        }
                    });
                } else {
                    self.execute_effect(effect).await;
                }
            }
        }

        if let Some(e) = failure {
            return Err(SessionError::Completion(e));
        }
        Ok(self
            .transcript
            .assistant_count()
            .saturating_sub(assistant_before))
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::BeginSession { user_label } => {
                self.begin_session(user_label);
                self.transcript.clear();
                tracing::info!(
                    session_key = %self.key,
                    session_id = %self.active_session_id(),
                    user_label = %self.context.user_label,
                    "Session started"
                );
            }

            Effect::AppendUserMessage { text, kind } => {
                let message = self.transcript.push_user(text, kind);
                tracing::debug!(sequence = message.sequence, kind = kind.as_str(), "User message appended");
            }

            Effect::AppendUtterances { utterances } => {
                tracing::debug!(count = utterances.len(), "Appending persona utterances");
                for utterance in utterances {
                    self.transcript
                        .push_assistant(utterance.speaker, utterance.text);
                }
            }

            Effect::PersistTranscript => self.persist().await,

            // Handled inline by dispatch
            Effect::RequestCompletion { .. } => {}
        }
    }

    fn begin_session(&mut self, user_label: String) {
        self.handle = Some(CompletionHandle {
            session_id: Uuid::new_v4(),
            persona_instructions: build_persona_instructions(&self.roster, &user_label),
        });
        self.context.user_label = user_label;
    }

    /// Build the request for the input that was just appended
    fn completion_request(&self, next_input: String) -> Result<CompletionRequest, LlmError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| LlmError::invalid_request("Session has not been started"))?;

        // The last entry is the input that triggered this call; it travels
        // as next_input rather than as history
        let prior = self
            .transcript
            .messages()
            .split_last()
            .map_or(&[][..], |(_, prior)| prior);

        tracing::debug!(session_id = %handle.session_id, "Requesting completion");
        Ok(CompletionRequest {
            persona_instructions: handle.persona_instructions.clone(),
            history: history::build(prior, self.max_turns),
            next_input,
        })
    }

    async fn persist(&mut self) {
        match self.store.save(&self.key, self.transcript.messages()).await {
            Ok(()) => {
                if self.storage_degraded {
                    tracing::info!(session_key = %self.key, "Transcript store recovered");
                    self.storage_degraded = false;
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_key = %self.key,
                    error = %e,
                    "Failed to save transcript, continuing in memory"
                );
                self.storage_degraded = true;
            }
        }
    }
}
