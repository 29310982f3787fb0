//! Model Factory
//!
//! Maps a model identifier to a provider:
//!
//! | model id            | backend                              |
//! |---------------------|--------------------------------------|
//! | `gpt-*`             | OpenAI-compatible endpoint           |
//! | `Qwen/*`            | OpenAI-compatible endpoint           |
//! | `ollama/<model>`    | local Ollama (feature `ollama`)      |
//! | anything else       | `gpt-3.5-turbo`, with a warning      |
//!
//! Every handle samples at temperature 0.

use std::sync::Arc;

use agent_core::{
    error::{AgentError, Result},
    provider::{GenerationOptions, LlmProvider, ModelFactory, ModelHandle},
};

use crate::openai::{OpenAiConfig, OpenAiProvider};

pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// Model ids offered to clients
pub const SUPPORTED_MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4", "Qwen/Qwen3-8B", "Qwen/Qwen2.5-7B"];

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    OpenAi(&'a str),
    Ollama(&'a str),
}

fn route(model_id: &str) -> Route<'_> {
    let model_id = model_id.trim();
    if model_id.starts_with("gpt-") || model_id.starts_with("Qwen/") {
        Route::OpenAi(model_id)
    } else if model_id.starts_with("ollama/") {
        Route::Ollama(model_id)
    } else {
        tracing::warn!(requested = %model_id, fallback = FALLBACK_MODEL, "unrecognized model id");
        Route::OpenAi(FALLBACK_MODEL)
    }
}

/// Default factory backed by environment configuration
pub struct DefaultModelFactory {
    openai: Option<Arc<OpenAiProvider>>,
    #[cfg(feature = "ollama")]
    ollama: Arc<crate::ollama::OllamaProvider>,
}

impl DefaultModelFactory {
    /// `openai` is `None` when no API key is configured; OpenAI-routed
    /// model ids then fail with a configuration error.
    pub fn new(openai: Option<OpenAiConfig>) -> Result<Self> {
        let openai = openai.map(OpenAiProvider::new).transpose()?.map(Arc::new);
        Ok(Self {
            openai,
            #[cfg(feature = "ollama")]
            ollama: Arc::new(crate::ollama::OllamaProvider::from_env()),
        })
    }

    pub fn from_env() -> Result<Self> {
        let openai = match OpenAiConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "OpenAI-compatible models disabled");
                None
            }
        };
        Self::new(openai)
    }

    fn handle(provider: Arc<dyn LlmProvider>, model: &str) -> ModelHandle {
        ModelHandle::new(
            provider,
            GenerationOptions {
                model: model.to_string(),
                temperature: 0.0,
                ..Default::default()
            },
        )
    }
}

impl ModelFactory for DefaultModelFactory {
    fn create(&self, model_id: &str) -> Result<ModelHandle> {
        match route(model_id) {
            Route::OpenAi(model) => {
                let provider = self.openai.clone().ok_or_else(|| {
                    AgentError::Config(format!("OPENAI_API_KEY not found; cannot use model '{model}'"))
                })?;
                Ok(Self::handle(provider, model))
            }
            #[cfg(feature = "ollama")]
            Route::Ollama(model) => Ok(Self::handle(self.ollama.clone(), model)),
            #[cfg(not(feature = "ollama"))]
            Route::Ollama(model) => Err(AgentError::Config(format!(
                "model '{model}' requires the ollama feature"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing() {
        assert_eq!(route("gpt-4"), Route::OpenAi("gpt-4"));
        assert_eq!(route("Qwen/Qwen3-8B"), Route::OpenAi("Qwen/Qwen3-8B"));
        assert_eq!(route("ollama/llama3"), Route::Ollama("ollama/llama3"));
        assert_eq!(route("claude-2"), Route::OpenAi(FALLBACK_MODEL));
    }

    #[test]
    fn test_fallback_model_id() {
        let factory = DefaultModelFactory::new(Some(OpenAiConfig::new("sk-test"))).unwrap();
        let handle = factory.create("mystery-model").unwrap();
        assert_eq!(handle.model_id(), FALLBACK_MODEL);
        assert_eq!(handle.provider_name(), "openai");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let factory = DefaultModelFactory::new(None).unwrap();
        assert!(matches!(factory.create("gpt-4"), Err(AgentError::Config(_))));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_needs_no_key() {
        let factory = DefaultModelFactory::new(None).unwrap();
        let handle = factory.create("ollama/llama3").unwrap();
        assert_eq!(handle.provider_name(), "ollama");
    }
}
