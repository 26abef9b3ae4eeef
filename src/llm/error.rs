//! Inference error types

use serde::Serialize;
use thiserror::Error;

/// Inference failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InferenceError {
    pub kind: FailureKind,
    pub message: String,
}

impl InferenceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unreachable, message)
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::new(FailureKind::BadResponse, message)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Empty, message)
    }

    /// Human-readable notice stored on the failed turn
    pub fn user_notice(&self) -> String {
        match self.kind {
            FailureKind::Unreachable => format!(
                "The model server could not be reached ({}). Check that it is running, or try a shorter message.",
                self.message
            ),
            FailureKind::BadResponse => {
                format!("The model server returned an unusable response ({}).", self.message)
            }
            FailureKind::Empty => "The model returned an empty response.".to_string(),
        }
    }
}

/// Why an inference call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS failure, timeout
    Unreachable,
    /// Error status or malformed payload from the backend
    BadResponse,
    /// Backend answered but produced no usable text
    Empty,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::BadResponse => "bad_response",
            FailureKind::Empty => "empty",
        }
    }
}
