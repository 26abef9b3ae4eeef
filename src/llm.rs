//! Inference backend abstraction
//!
//! One outbound call per turn, no retries. Every failure is folded into an
//! [`InferenceError`] with a [`FailureKind`].

mod error;
mod lmstudio;
mod types;

pub use error::{FailureKind, InferenceError};
pub use lmstudio::LmStudioClient;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a single inference call
pub type CompletionResult = Result<LlmResponse, InferenceError>;

/// Common interface for inference backends
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Make a completion request. Bounded by the client's timeout.
    async fn complete(&self, request: &LlmRequest) -> CompletionResult;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: InferenceClient + ?Sized> InferenceClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> CompletionResult {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for inference clients
pub struct LoggingClient {
    inner: Arc<dyn InferenceClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn InferenceClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl InferenceClient for LoggingClient {
    async fn complete(&self, request: &LlmRequest) -> CompletionResult {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Inference completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "Inference failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
