//! Capability Contract
//!
//! A capability is one external action (search, compute, lookup) a
//! reasoning loop may call. Providers implement [`Capability`] and may
//! fail; the registry wraps each one in a [`CapabilityDescriptor`] whose
//! [`invoke`](CapabilityDescriptor::invoke) is total: every failure, panics
//! included, comes back as descriptive text the loop can observe.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Capability metadata shown to the reasoning loop
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilitySchema {
    /// Unique identifier, also the registry key
    pub name: String,

    /// When to use it and what input it expects (shown to the LLM)
    pub description: String,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,
}

impl CapabilitySchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Provider trait - implement to add new capabilities
#[async_trait]
pub trait Capability: Send + Sync {
    /// Run the capability on free-text input
    async fn run(&self, input: &str) -> Result<String>;

    /// Guidance appended to the observation when `run` fails
    fn failure_hint(&self) -> Option<&str> {
        None
    }
}

/// Adapts a synchronous closure into a [`Capability`]
pub struct FnCapability<F> {
    func: F,
}

impl<F> FnCapability<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn run(&self, input: &str) -> Result<String> {
        (self.func)(input)
    }
}

/// Registry entry for one capability
#[derive(Clone)]
pub struct CapabilityDescriptor {
    schema: CapabilitySchema,
    provider: Option<Arc<dyn Capability>>,
    unavailable_reason: Option<String>,
    failure_hint: Option<String>,
}

impl std::fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.schema.name)
            .field("available", &self.is_available())
            .field("unavailable_reason", &self.unavailable_reason)
            .finish_non_exhaustive()
    }
}

impl CapabilityDescriptor {
    /// A constructed, invocable capability
    pub fn available(schema: CapabilitySchema, provider: Arc<dyn Capability>) -> Self {
        Self {
            schema,
            provider: Some(provider),
            unavailable_reason: None,
            failure_hint: None,
        }
    }

    /// A capability whose precondition or construction failed
    pub fn unavailable(schema: CapabilitySchema, reason: impl Into<String>) -> Self {
        Self {
            schema,
            provider: None,
            unavailable_reason: Some(reason.into()),
            failure_hint: None,
        }
    }

    /// Text appended to failure observations (e.g. "try another tool")
    #[must_use]
    pub fn with_failure_hint(mut self, hint: impl Into<String>) -> Self {
        self.failure_hint = Some(hint.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn description(&self) -> &str {
        &self.schema.description
    }

    pub const fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    pub const fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// Invoke the capability. Never fails: errors become the observation.
    pub async fn invoke(&self, input: &str) -> String {
        let Some(provider) = &self.provider else {
            return format!(
                "{} is not available: {}",
                self.name(),
                self.unavailable_reason().unwrap_or("not configured")
            );
        };

        tracing::debug!(capability = %self.name(), "invoking capability");
        let output = safe_invoke(self.name(), provider.run(input)).await;

        match (&output, &self.failure_hint) {
            (Err(message), Some(hint)) => format!("{message}. {hint}"),
            (Err(message), None) => message.clone(),
            (Ok(text), _) if text.trim().is_empty() => {
                format!("{} returned no results.", self.name())
            }
            (Ok(text), _) => text.clone(),
        }
    }
}

/// Run a fallible capability call, converting errors and panics into
/// `"<name> failed: <cause>"`.
pub async fn safe_invoke<F>(name: &str, call: F) -> std::result::Result<String, String>
where
    F: Future<Output = Result<String>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            tracing::warn!(capability = %name, error = %e, "capability call failed");
            Err(format!("{name} failed: {e}"))
        }
        Err(panic) => {
            let cause = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".into());
            tracing::error!(capability = %name, cause = %cause, "capability panicked");
            Err(format!("{name} failed: {cause}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    fn schema(name: &str) -> CapabilitySchema {
        CapabilitySchema::new(name, "test capability")
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let cap = CapabilityDescriptor::available(
            schema("echo"),
            Arc::new(FnCapability::new(|input: &str| Ok(format!("echo: {input}")))),
        );
        assert!(cap.is_available());
        assert_eq!(cap.invoke("hi").await, "echo: hi");
    }

    #[tokio::test]
    async fn test_invoke_converts_error() {
        let cap = CapabilityDescriptor::available(
            schema("search"),
            Arc::new(FnCapability::new(|_: &str| {
                Err(AgentError::Other("connection refused".into()))
            })),
        );
        assert_eq!(cap.invoke("rust").await, "search failed: connection refused");
    }

    #[tokio::test]
    async fn test_invoke_appends_hint() {
        let cap = CapabilityDescriptor::available(
            schema("wolfram-alpha"),
            Arc::new(FnCapability::new(|_: &str| Err(AgentError::Other("bad appid".into())))),
        )
        .with_failure_hint("Please try a different tool or rephrase your query.");
        let out = cap.invoke("x").await;
        assert!(out.starts_with("wolfram-alpha failed: bad appid."));
        assert!(out.ends_with("rephrase your query."));
    }

    #[tokio::test]
    async fn test_invoke_catches_panic() {
        let cap = CapabilityDescriptor::available(
            schema("fragile"),
            Arc::new(FnCapability::new(|_: &str| -> Result<String> { panic!("boom") })),
        );
        assert_eq!(cap.invoke("x").await, "fragile failed: boom");
    }

    #[tokio::test]
    async fn test_unavailable_invoke_is_text() {
        let cap = CapabilityDescriptor::unavailable(schema("openweathermap"), "OWM_API_KEY not set");
        assert!(!cap.is_available());
        assert_eq!(
            cap.invoke("Paris").await,
            "openweathermap is not available: OWM_API_KEY not set"
        );
    }

    #[tokio::test]
    async fn test_empty_output_is_described() {
        let cap = CapabilityDescriptor::available(
            schema("ddg-search"),
            Arc::new(FnCapability::new(|_: &str| Ok(String::new()))),
        );
        assert_eq!(cap.invoke("q").await, "ddg-search returned no results.");
    }
}
