//! Google Gemini provider implementation

use super::types::{Completion, CompletionRequest, TurnRole, Usage};
use super::{CompletionService, LlmError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the completion backend
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
    /// Override for the API root (proxies, test servers)
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            model: std::env::var("GEMINI_MODEL").ok(),
            base_url: std::env::var("GEMINI_BASE_URL").ok(),
            timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let model_id = model.into();
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/'),
            model_id
        );

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
            model_id,
        })
    }

    /// Build the service from configuration; `None` when no key is set
    pub fn from_config(config: &LlmConfig) -> Option<Result<Self, LlmError>> {
        let api_key = config.gemini_api_key.as_ref().filter(|k| !k.is_empty())?;
        Some(Self::new(
            api_key.clone(),
            config.model.as_deref().unwrap_or(DEFAULT_MODEL),
            config.base_url.as_deref(),
            Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        ))
    }

    fn translate_request(request: &CompletionRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = Vec::new();

        let turns = request
            .history
            .iter()
            .map(|turn| (turn.role, turn.text.as_str()))
            .chain(std::iter::once((TurnRole::User, request.next_input.as_str())));

        // Consecutive turns from the same role share one content entry,
        // e.g. several persona utterances in a row
        for (role, text) in turns {
            if text.trim().is_empty() {
                continue;
            }
            let part = GeminiPart {
                text: text.to_string(),
            };
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role.as_str()) => last.parts.push(part),
                _ => contents.push(GeminiContent {
                    role: Some(role.as_str().to_string()),
                    parts: vec![part],
                }),
            }
        }

        let system_instruction = if request.persona_instructions.trim().is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.persona_instructions.clone(),
                }],
            })
        };

        GeminiRequest {
            contents,
            system_instruction,
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<Completion, LlmError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::unknown(format!("Empty response: {reason}")));
        };

        // A candidate stopped by safety filters carries no content; that is
        // an empty reply rather than a failure
        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            tracing::debug!(finish_reason = ?candidate.finish_reason, "Gemini returned no text");
        }

        let usage = resp.usage_metadata.unwrap_or_default();
        Ok(Completion {
            text,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(match status.as_u16() {
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
