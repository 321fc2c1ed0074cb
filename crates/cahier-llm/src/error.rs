//! Error types for cahier-llm

use thiserror::Error;

/// Errors that can occur while requesting a completion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network failure, timeout, rate limit or server-side error.
    /// The same request may succeed if retried.
    #[error("transient LLM failure: {0}")]
    Transient(String),

    /// The model answered but the reply carried no usable text
    #[error("unusable LLM reply: {0}")]
    Content(String),

    /// The API rejected the request
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Client is missing required configuration
    #[error("LLM client misconfigured: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether the caller may retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            LlmError::Transient(err.to_string())
        } else if err.is_decode() {
            LlmError::Content(err.to_string())
        } else {
            LlmError::Transient(err.to_string())
        }
    }
}
