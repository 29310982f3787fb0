//! Capability Registry
//!
//! Built once per credential environment, immutable afterwards. Every known
//! capability is registered through [`RegistryBuilder::probe`]:
//!
//! 1. check the precondition (credential present, dependency resolvable);
//!    a miss records the capability unavailable and moves on
//! 2. construct the provider; a failure records it unavailable with a
//!    diagnostic
//! 3. wrap the provider in a total [`CapabilityDescriptor`]
//!
//! Only a duplicate name fails the build.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Serialize;

use crate::capability::{Capability, CapabilityDescriptor, CapabilitySchema};
use crate::error::{AgentError, Result};

/// Outcome of a precondition check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    Met,
    Missing(String),
}

impl Precondition {
    pub fn missing(reason: impl Into<String>) -> Self {
        Self::Missing(reason.into())
    }
}

/// Availability report for one registered capability
#[derive(Clone, Debug, Serialize)]
pub struct CapabilityStatus {
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of resolving requested names against the registry
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Resolved capabilities, in request order, without duplicates
    pub capabilities: Vec<CapabilityDescriptor>,

    /// One entry per skipped name
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(CapabilityDescriptor::name).collect()
    }
}

/// Immutable name → descriptor mapping, in registration order
#[derive(Clone, Debug, Default)]
pub struct CapabilityRegistry {
    entries: Vec<CapabilityDescriptor>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Get a descriptor by name, available or not
    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.entries
    }

    /// Names of capabilities that can be bound
    pub fn available_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.is_available())
            .map(CapabilityDescriptor::name)
            .collect()
    }

    pub fn status(&self) -> Vec<CapabilityStatus> {
        self.entries
            .iter()
            .map(|d| CapabilityStatus {
                name: d.name().to_string(),
                description: d.description().to_string(),
                available: d.is_available(),
                reason: d.unavailable_reason().map(str::to_string),
            })
            .collect()
    }

    /// Number of registered capabilities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve requested names. Unknown and unavailable names are skipped
    /// with a warning; repeats are bound once. Never fails.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Resolution {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }

            match self.get(name) {
                Some(descriptor) if descriptor.is_available() => {
                    resolution.capabilities.push(descriptor.clone());
                }
                Some(descriptor) => {
                    let warning = format!(
                        "Tool '{name}' is unavailable: {}",
                        descriptor.unavailable_reason().unwrap_or("not configured")
                    );
                    tracing::warn!(capability = %name, "{warning}");
                    resolution.warnings.push(warning);
                }
                None => {
                    let warning = format!("Tool '{name}' not found in available tools.");
                    tracing::warn!(capability = %name, "{warning}");
                    resolution.warnings.push(warning);
                }
            }
        }

        resolution
    }
}

/// Accumulates descriptors; see the module docs for the probe protocol
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: CapabilityRegistry,
}

impl RegistryBuilder {
    /// Register a ready-made descriptor
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Result<&mut Self> {
        let name = descriptor.name().to_string();
        if self.registry.index.contains_key(&name) {
            return Err(AgentError::DuplicateCapability(name));
        }

        self.registry.index.insert(name, self.registry.entries.len());
        self.registry.entries.push(descriptor);
        Ok(self)
    }

    /// Check `precondition`, then construct and register the provider.
    /// Missing preconditions and construction failures register the
    /// capability as unavailable instead of failing.
    pub fn probe<F>(
        &mut self,
        schema: CapabilitySchema,
        precondition: Precondition,
        construct: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce() -> Result<Arc<dyn Capability>>,
    {
        if self.registry.index.contains_key(&schema.name) {
            return Err(AgentError::DuplicateCapability(schema.name));
        }

        if let Precondition::Missing(reason) = precondition {
            tracing::info!(capability = %schema.name, "{reason}; capability will not be available");
            return self.register(CapabilityDescriptor::unavailable(schema, reason));
        }

        let descriptor = match std::panic::catch_unwind(AssertUnwindSafe(construct)) {
            Ok(Ok(provider)) => {
                let hint = provider.failure_hint().map(str::to_string);
                let descriptor = CapabilityDescriptor::available(schema, provider);
                match hint {
                    Some(hint) => descriptor.with_failure_hint(hint),
                    None => descriptor,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(capability = %schema.name, error = %e, "could not initialize capability");
                CapabilityDescriptor::unavailable(schema, format!("initialization failed: {e}"))
            }
            Err(_) => {
                tracing::warn!(capability = %schema.name, "capability constructor panicked");
                CapabilityDescriptor::unavailable(schema, "initialization failed")
            }
        };

        self.register(descriptor)
    }

    pub fn build(self) -> CapabilityRegistry {
        tracing::info!(
            registered = self.registry.len(),
            available = self.registry.available_names().len(),
            "capability registry built"
        );
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FnCapability;

    fn echo() -> Arc<dyn Capability> {
        Arc::new(FnCapability::new(|input: &str| Ok(input.to_string())))
    }

    fn registry() -> CapabilityRegistry {
        let mut builder = CapabilityRegistry::builder();
        builder
            .probe(CapabilitySchema::new("wikipedia", "encyclopedia"), Precondition::Met, || Ok(echo()))
            .unwrap()
            .probe(
                CapabilitySchema::new("openweathermap", "weather"),
                Precondition::missing("OWM_API_KEY not found"),
                || panic!("must not construct without credentials"),
            )
            .unwrap()
            .probe(CapabilitySchema::new("arxiv", "papers"), Precondition::Met, || {
                Err(AgentError::Config("client build failed".into()))
            })
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_probe_records_availability() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.available_names(), vec!["wikipedia"]);

        let weather = registry.get("openweathermap").unwrap();
        assert_eq!(weather.unavailable_reason(), Some("OWM_API_KEY not found"));

        let arxiv = registry.get("arxiv").unwrap();
        assert!(arxiv.unavailable_reason().unwrap().contains("client build failed"));
    }

    #[test]
    fn test_resolve_skips_unknown() {
        let resolution = registry().resolve(&["wikipedia", "nonexistent-tool"]);
        assert_eq!(resolution.names(), vec!["wikipedia"]);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].contains("nonexistent-tool"));
    }

    #[test]
    fn test_resolve_skips_unavailable_and_duplicates() {
        let resolution = registry().resolve(&["wikipedia", "openweathermap", "wikipedia", "arxiv"]);
        assert_eq!(resolution.names(), vec!["wikipedia"]);
        assert_eq!(resolution.warnings.len(), 2);
    }

    #[test]
    fn test_resolve_empty_request() {
        let resolution = registry().resolve::<&str>(&[]);
        assert!(resolution.capabilities.is_empty());
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_name_is_error() {
        let mut builder = CapabilityRegistry::builder();
        builder
            .probe(CapabilitySchema::new("ddg-search", "a"), Precondition::Met, || Ok(echo()))
            .unwrap();
        let err = builder
            .probe(CapabilitySchema::new("ddg-search", "b"), Precondition::Met, || Ok(echo()))
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateCapability(name) if name == "ddg-search"));
    }

    #[test]
    fn test_status_report() {
        let status = registry().status();
        assert_eq!(status.len(), 3);
        assert!(status[0].available);
        assert!(!status[1].available);
        assert!(status[1].reason.is_some());
    }
}
