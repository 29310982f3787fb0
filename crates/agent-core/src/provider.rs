//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM backends (OpenAI-compatible
//! endpoints, Ollama, ...) and the model factory that maps a model
//! identifier to a configured [`ModelHandle`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{ModelFactory, ModelHandle};
//!
//! let model: ModelHandle = factory.create("gpt-4")?;
//! let completion = model.complete(&messages).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-3.5-turbo", "Qwen/Qwen3-8B")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

const fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text completion with no usage data
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// Executors work exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}

/// A provider bound to the options of one model
#[derive(Clone)]
pub struct ModelHandle {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("provider", &self.provider.name())
            .field("model", &self.options.model)
            .finish()
    }
}

impl ModelHandle {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }

    /// Model identifier this handle generates with
    pub fn model_id(&self) -> &str {
        &self.options.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Complete with the handle's own options
    pub async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        self.provider.complete(messages, &self.options).await
    }

    /// Complete, cutting generation at any of `stop`
    pub async fn complete_until(&self, messages: &[Message], stop: &[&str]) -> Result<Completion> {
        let mut options = self.options.clone();
        options
            .stop_sequences
            .extend(stop.iter().map(|s| (*s).to_string()));
        self.provider.complete(messages, &options).await
    }
}

/// Maps a model identifier to a configured client handle.
///
/// Failure here is a hard configuration error for agent construction.
pub trait ModelFactory: Send + Sync {
    fn create(&self, model_id: &str) -> Result<ModelHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!(opts.temperature.abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: GenerationOptions = serde_json::from_str(r#"{"model": "gpt-4"}"#).unwrap();
        assert_eq!(opts.model, "gpt-4");
        assert!(opts.stop_sequences.is_empty());
    }
}
