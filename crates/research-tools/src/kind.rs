//! Capability Kinds
//!
//! The fixed set of capabilities this crate can provide, and the startup
//! probe that registers each of them as available or unavailable.

use std::str::FromStr;
use std::sync::Arc;

use agent_core::{
    AgentError, Capability, CapabilityRegistry, CapabilitySchema, Credentials, ModelHandle,
    Precondition, Result,
};

use crate::svckit::{
    Arxiv, Calculator, CriticalSearch, DdgSearch, GoogleSearch, OpenWeatherMap, PythonRepl,
    Wikipedia, WolframAlpha, find_interpreter, http_client,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    LlmMath,
    PythonRepl,
    Wikipedia,
    Arxiv,
    DdgSearch,
    CriticalSearch,
    OpenWeatherMap,
    WolframAlpha,
    GoogleSearch,
}

impl CapabilityKind {
    /// Registration order
    pub const ALL: [Self; 9] = [
        Self::LlmMath,
        Self::PythonRepl,
        Self::Wikipedia,
        Self::Arxiv,
        Self::DdgSearch,
        Self::CriticalSearch,
        Self::OpenWeatherMap,
        Self::WolframAlpha,
        Self::GoogleSearch,
    ];

    /// Registry key
    pub const fn name(self) -> &'static str {
        match self {
            Self::LlmMath => "llm-math",
            Self::PythonRepl => "python_repl",
            Self::Wikipedia => "wikipedia",
            Self::Arxiv => "arxiv",
            Self::DdgSearch => "ddg-search",
            Self::CriticalSearch => "critical_search",
            Self::OpenWeatherMap => "openweathermap",
            Self::WolframAlpha => "wolfram-alpha",
            Self::GoogleSearch => "google-search",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::LlmMath => "Useful for when you need to answer questions about math.",
            Self::PythonRepl => {
                "A Python shell. Use this to execute python commands. Input should be a valid \
                 python command. If you want to see the output of a value, you should print it \
                 out with `print(...)`."
            }
            Self::Wikipedia => {
                "A wrapper around Wikipedia. Useful for when you need to answer general \
                 questions about people, places, companies, facts, historical events, or other \
                 subjects. Input should be a search query."
            }
            Self::Arxiv => {
                "A wrapper around Arxiv.org. Useful for when you need to answer questions about \
                 Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative \
                 Finance, Statistics, Electrical Engineering, and Economics from scientific \
                 articles on arxiv.org. Input should be a search query."
            }
            Self::DdgSearch => "Search the web using DuckDuckGo. Input should be a search query.",
            Self::CriticalSearch => {
                "A tool to answer complicated questions. Useful for when you need to answer \
                 questions about current events. Input should be a question."
            }
            Self::OpenWeatherMap => {
                "Get current weather information for a specific location. Use this when asked \
                 about current weather conditions. Input should be a location name or a city \
                 name like 'Beijing' or 'New York'."
            }
            Self::WolframAlpha => {
                "A wrapper around Wolfram Alpha. Useful for when you need to answer questions \
                 about Math, Science, Technology, Culture, Society and Everyday Life. Input \
                 should be a search query."
            }
            Self::GoogleSearch => {
                "A wrapper around Google Search. Useful for when you need to answer questions \
                 about current events. Input should be a search query."
            }
        }
    }

    pub const fn category(self) -> &'static str {
        match self {
            Self::LlmMath | Self::PythonRepl => "compute",
            Self::Wikipedia | Self::Arxiv => "reference",
            Self::DdgSearch | Self::CriticalSearch | Self::GoogleSearch => "search",
            Self::OpenWeatherMap => "weather",
            Self::WolframAlpha => "knowledge",
        }
    }

    /// Credentials that must be present before construction is attempted
    pub const fn required_credentials(self) -> &'static [&'static str] {
        match self {
            Self::OpenWeatherMap => &["OWM_API_KEY"],
            Self::WolframAlpha => &["WOLFRAM_ALPHA_APPID"],
            Self::GoogleSearch => &["GOOGLE_API_KEY", "GOOGLE_CSE_ID"],
            _ => &[],
        }
    }

    pub fn schema(self) -> CapabilitySchema {
        CapabilitySchema::new(self.name(), self.description()).with_category(self.category())
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CapabilityKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| AgentError::Other(format!("unknown capability '{s}'")))
    }
}

/// Everything a provider constructor may need
struct ProbeContext<'a> {
    credentials: &'a Credentials,
    model: Option<&'a ModelHandle>,
    client: Option<reqwest::Client>,
}

impl ProbeContext<'_> {
    fn client(&self) -> Result<reqwest::Client> {
        self.client
            .clone()
            .ok_or_else(|| AgentError::Config("HTTP client could not be initialized".into()))
    }

    fn model(&self) -> Result<ModelHandle> {
        self.model
            .cloned()
            .ok_or_else(|| AgentError::Config("no language model configured".into()))
    }

    fn credential(&self, key: &str) -> Result<String> {
        self.credentials
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| AgentError::Config(format!("{key} not found")))
    }

    fn precondition(&self, kind: CapabilityKind) -> Precondition {
        match kind {
            CapabilityKind::PythonRepl if find_interpreter().is_none() => {
                Precondition::missing("python3/python not found on PATH")
            }
            CapabilityKind::LlmMath | CapabilityKind::CriticalSearch if self.model.is_none() => {
                Precondition::missing("no language model configured")
            }
            kind => self.credentials.require(kind.required_credentials()),
        }
    }

    fn search(&self) -> Option<Arc<dyn Capability>> {
        self.client
            .clone()
            .map(|client| Arc::new(DdgSearch::new(client)) as Arc<dyn Capability>)
    }

    fn construct(&self, kind: CapabilityKind) -> Result<Arc<dyn Capability>> {
        let provider: Arc<dyn Capability> = match kind {
            CapabilityKind::LlmMath => Arc::new(Calculator::new(self.model()?)),
            CapabilityKind::PythonRepl => {
                let interpreter = find_interpreter()
                    .ok_or_else(|| AgentError::Config("python interpreter disappeared".into()))?;
                Arc::new(PythonRepl::new(interpreter))
            }
            CapabilityKind::Wikipedia => Arc::new(Wikipedia::new(self.client()?)),
            CapabilityKind::Arxiv => Arc::new(Arxiv::new(self.client()?)),
            CapabilityKind::DdgSearch => Arc::new(DdgSearch::new(self.client()?)),
            CapabilityKind::CriticalSearch => {
                Arc::new(CriticalSearch::new(self.model()?, self.search()))
            }
            CapabilityKind::OpenWeatherMap => Arc::new(OpenWeatherMap::new(
                self.client()?,
                self.credential("OWM_API_KEY")?,
            )),
            CapabilityKind::WolframAlpha => Arc::new(WolframAlpha::new(
                self.client()?,
                self.credential("WOLFRAM_ALPHA_APPID")?,
            )),
            CapabilityKind::GoogleSearch => Arc::new(GoogleSearch::new(
                self.client()?,
                self.credential("GOOGLE_API_KEY")?,
                self.credential("GOOGLE_CSE_ID")?,
            )),
        };
        Ok(provider)
    }
}

/// Probe every [`CapabilityKind`] and register it. Missing credentials or
/// runtimes register the capability as unavailable; this only fails on a
/// duplicate registration.
///
/// `model` backs the capabilities that reason internally (`llm-math`,
/// `critical_search`); without one they register as unavailable.
pub fn build_registry(
    credentials: &Credentials,
    model: Option<&ModelHandle>,
) -> Result<CapabilityRegistry> {
    let client = match http_client() {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "HTTP client unavailable, network capabilities disabled");
            None
        }
    };
    let ctx = ProbeContext {
        credentials,
        model,
        client,
    };

    let mut builder = CapabilityRegistry::builder();
    for kind in CapabilityKind::ALL {
        builder.probe(kind.schema(), ctx.precondition(kind), || ctx.construct(kind))?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use agent_core::testing::ScriptedProvider;

    use super::*;

    fn model() -> ModelHandle {
        ScriptedProvider::always("Final Answer: ok").handle("gpt-3.5-turbo")
    }

    #[test]
    fn test_names_round_trip() {
        for kind in CapabilityKind::ALL {
            assert_eq!(kind.name().parse::<CapabilityKind>().unwrap(), kind);
        }
        assert!("nonexistent-tool".parse::<CapabilityKind>().is_err());
    }

    #[test]
    fn test_missing_credentials_degrade() {
        let registry = build_registry(&Credentials::new(), Some(&model())).unwrap();
        assert_eq!(registry.len(), CapabilityKind::ALL.len());

        for name in ["llm-math", "wikipedia", "arxiv", "ddg-search", "critical_search"] {
            assert!(registry.get(name).unwrap().is_available(), "{name} should be available");
        }

        let weather = registry.get("openweathermap").unwrap();
        assert!(!weather.is_available());
        assert_eq!(weather.unavailable_reason(), Some("OWM_API_KEY not found"));

        let google = registry.get("google-search").unwrap();
        assert_eq!(
            google.unavailable_reason(),
            Some("GOOGLE_API_KEY and/or GOOGLE_CSE_ID not found")
        );
    }

    #[test]
    fn test_credentials_enable_capabilities() {
        let credentials = Credentials::new()
            .with("OWM_API_KEY", "owm")
            .with("WOLFRAM_ALPHA_APPID", "wa")
            .with("GOOGLE_API_KEY", "g")
            .with("GOOGLE_CSE_ID", "cse");
        let registry = build_registry(&credentials, Some(&model())).unwrap();

        for name in ["openweathermap", "wolfram-alpha", "google-search"] {
            assert!(registry.get(name).unwrap().is_available(), "{name} should be available");
        }
    }

    #[test]
    fn test_no_model_disables_reasoning_capabilities() {
        let registry = build_registry(&Credentials::new(), None).unwrap();
        for name in ["llm-math", "critical_search"] {
            let descriptor = registry.get(name).unwrap();
            assert!(!descriptor.is_available());
            assert_eq!(descriptor.unavailable_reason(), Some("no language model configured"));
        }
        assert!(registry.get("wikipedia").unwrap().is_available());
    }

    #[test]
    fn test_partial_google_credentials() {
        let credentials = Credentials::new().with("GOOGLE_API_KEY", "g");
        let registry = build_registry(&credentials, Some(&model())).unwrap();
        assert!(!registry.get("google-search").unwrap().is_available());
    }

    #[test]
    fn test_resolve_with_defaults() {
        let registry = build_registry(&Credentials::new(), Some(&model())).unwrap();
        let resolution =
            registry.resolve(&["ddg-search", "wikipedia", "arxiv", "openweathermap"]);
        assert_eq!(resolution.names(), vec!["ddg-search", "wikipedia", "arxiv"]);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_calculator_through_registry() {
        let registry = build_registry(&Credentials::new(), Some(&model())).unwrap();
        let out = registry.get("llm-math").unwrap().invoke("2 + 2").await;
        assert_eq!(out, "Answer: 4");
    }
}
