//! Completion service abstraction
//!
//! The language model is an opaque text-completion backend: it receives the
//! persona instructions, a windowed history and the next input, and returns
//! one freeform block of text.

mod error;
mod gemini;
mod types;

pub use error::LlmError;
pub use gemini::{GeminiService, LlmConfig};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion backends
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(completion) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_turns = request.history.len(),
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    retryable = e.kind.is_retryable(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
