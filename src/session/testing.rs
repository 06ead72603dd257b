//! Mock implementations for testing
//!
//! These mocks enable session tests without network or disk I/O.

use crate::llm::{Completion, CompletionRequest, CompletionService, LlmError};
use crate::store::{MemoryStore, StoreError, StoreResult, TranscriptStore};
use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Completion Service
// ============================================================================

/// Completion service that returns queued responses
#[derive(Default)]
pub struct MockCompletionService {
    responses: Mutex<VecDeque<Result<Completion, LlmError>>>,
    /// Record of all requests made
    requests: Mutex<Vec<CompletionRequest>>,
    /// Next call never resolves
    hang_next: AtomicBool,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Completion::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Make the next call hang until its future is dropped
    pub fn hang_next_call(&self) {
        self.hang_next.store(true, Ordering::SeqCst);
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.hang_next.swap(false, Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl TranscriptStore for FailingStore {
    async fn load(&self, _key: &str) -> StoreResult<Vec<Message>> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    async fn save(&self, _key: &str, _messages: &[Message]) -> StoreResult<()> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }
}

// ============================================================================
// Stalling Store
// ============================================================================

/// In-memory store whose next save hangs until its future is dropped
#[derive(Default)]
pub struct StallingStore {
    inner: MemoryStore,
    stall_next: AtomicBool,
}

impl StallingStore {
    pub fn stall_next_save(&self) {
        self.stall_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TranscriptStore for StallingStore {
    async fn load(&self, key: &str) -> StoreResult<Vec<Message>> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, messages: &[Message]) -> StoreResult<()> {
        if self.stall_next.swap(false, Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.inner.save(key, messages).await
    }
}
