//! # research-tools
//!
//! Research capabilities for the agent: math, Python, Wikipedia, arXiv,
//! web search, weather, Wolfram|Alpha and a self-ask "critical search"
//! sub-agent.
//!
//! ## Availability
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────┐
//! │ llm-math         │ a model handle                           │
//! │ python_repl      │ python3 / python on PATH                 │
//! │ wikipedia        │ always (network)                         │
//! │ arxiv            │ always (network)                         │
//! │ ddg-search       │ always (network)                         │
//! │ critical_search  │ a model handle; stub search without ddg  │
//! │ openweathermap   │ OWM_API_KEY                              │
//! │ wolfram-alpha    │ WOLFRAM_ALPHA_APPID                      │
//! │ google-search    │ GOOGLE_API_KEY + GOOGLE_CSE_ID           │
//! └──────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Anything whose requirement is missing is registered as unavailable;
//! requesting it later yields a warning, never an error.

pub mod error;
pub mod kind;
pub mod svckit;

pub use error::{Result, ToolError};
pub use kind::{CapabilityKind, build_registry};

/// Capability names bound when a request does not choose any
pub const DEFAULT_CAPABILITIES: &[&str] = &["ddg-search", "wikipedia", "arxiv", "openweathermap"];
