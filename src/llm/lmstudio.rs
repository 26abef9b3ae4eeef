//! LM Studio (`OpenAI`-compatible) provider implementation

use super::types::{clean_completion, LlmRequest, LlmResponse, Usage};
use super::{InferenceClient, InferenceError};
use crate::config::InferenceConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ceiling for the model discovery call, independent of the completion timeout
const MODEL_INFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a local `OpenAI`-compatible chat completions server
pub struct LmStudioClient {
    client: Client,
    chat_url: String,
    models_url: String,
    model: String,
}

impl LmStudioClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, reqwest::Error> {
        let base = config.base_url.trim_end_matches('/');

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            client,
            chat_url: format!("{base}/chat/completions"),
            models_url: format!("{base}/models"),
            model: config.model.clone(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
            stream: false,
        }
    }

    fn normalize_response(resp: ChatResponse) -> Result<LlmResponse, InferenceError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::empty("No choices in response"))?;

        let raw = choice
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| InferenceError::empty("Choice has no message content"))?;

        let text = clean_completion(&raw);
        if text.is_empty() {
            return Err(InferenceError::empty("Completion text is blank"));
        }

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(LlmResponse { text, usage })
    }

    /// Context length the backend reports for the configured model.
    ///
    /// Returns `None` when the backend cannot be asked or does not say.
    pub async fn context_length(&self) -> Option<usize> {
        let response = match self
            .client
            .get(&self.models_url)
            .timeout(MODEL_INFO_TIMEOUT)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Model info request rejected");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not get model info");
                return None;
            }
        };

        let models: ModelList = match response.json().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed model info");
                return None;
            }
        };

        models
            .data
            .into_iter()
            .find(|m| m.id == self.model)
            .and_then(|m| m.context_length)
    }
}

#[async_trait]
impl InferenceClient for LmStudioClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, InferenceError> {
        let chat_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.chat_url)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::unreachable(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    InferenceError::unreachable(format!("Connection failed: {e}"))
                } else {
                    InferenceError::unreachable(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::unreachable(format!("Request timeout: {e}"))
            } else {
                InferenceError::bad_response(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(InferenceError::bad_response(format!(
                    "HTTP {status}: {}",
                    error_resp.error.message()
                )));
            }
            return Err(InferenceError::bad_response(format!("HTTP {status}: {body}")));
        }

        let chat_response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            InferenceError::bad_response(format!("Failed to parse response: {e}"))
        })?;

        Self::normalize_response(chat_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// LM Studio sends either `{"error": "text"}` or `{"error": {"message": ...}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Text(String),
    Object { message: String },
}

impl ErrorBody {
    fn message(&self) -> &str {
        match self {
            ErrorBody::Text(message) | ErrorBody::Object { message } => message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default, alias = "max_context_length")]
    context_length: Option<usize>,
}
