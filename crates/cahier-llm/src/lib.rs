//! Cahier-LLM: Language-Model Completion for Cahier Agents
//!
//! This crate provides the completion collaborator used by the Writer,
//! Evaluator and Optimizer agents. Callers hand it a prompt (and an
//! optional system prompt) and get raw text back; turning that text into
//! a validated payload is the caller's job.
//!
//! ## Key Components
//!
//! - `LlmClient`: backend-agnostic completion trait
//! - `AnthropicClient`: HTTP client for the Anthropic Messages API
//! - `fakes::ScriptedLlm`: deterministic replay double for tests

mod anthropic;
mod error;
pub mod fakes;

pub use anthropic::{AnthropicClient, LlmConfig};
pub use error::LlmError;

use async_trait::async_trait;

/// Result type for completion operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// A text completion backend.
///
/// Implementations must not retry internally on `LlmError::Content`;
/// retry policy belongs to the calling agent.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, optionally steered by `system_prompt`.
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// Identifier of the model behind this client (for logs).
    fn model_name(&self) -> &str;
}
