//! # agent-runtime
//!
//! Model providers for research-agent.
//!
//! ## Providers
//!
//! - **OpenAI-compatible**: `gpt-*` and `Qwen/*` model ids, any server
//!   exposing `/chat/completions`
//! - **Ollama** (default feature): `ollama/<model>` ids, local inference
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::DefaultModelFactory;
//!
//! let models = DefaultModelFactory::from_env()?;
//! let session = AgentBuilder::new()
//!     .model("Qwen/Qwen3-8B")
//!     .build(&models, &registry)?;
//! ```

pub mod factory;
pub mod openai;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use factory::{DefaultModelFactory, FALLBACK_MODEL, SUPPORTED_MODELS};
pub use openai::{OpenAiConfig, OpenAiProvider};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
