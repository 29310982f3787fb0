//! Application State

use std::sync::Arc;

use tokio::sync::Mutex;

use agent_core::{
    AgentBuilder, AgentSession, CapabilityRegistry, Credentials, ModelFactory, Result,
    SharedMemory, Strategy,
};
use research_tools::build_registry;

use crate::config::ServerConfig;

/// What an agent session is built from; a new key rebuilds the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKey {
    pub strategy: Strategy,
    pub model: String,
    pub tools: Vec<String>,
}

struct CachedSession {
    key: SessionKey,
    session: Arc<AgentSession>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Resolves model ids to provider handles
    pub models: Arc<dyn ModelFactory>,

    pub credentials: Arc<Credentials>,

    /// Registry probed at startup against the default model, for status
    /// reporting
    pub registry: Arc<CapabilityRegistry>,

    /// Conversation turns shared by every session this server builds
    pub memory: SharedMemory,

    pub config: Arc<ServerConfig>,

    session: Arc<Mutex<Option<CachedSession>>>,
}

impl AppState {
    /// Probe capabilities once. A default model that cannot be created only
    /// disables the capabilities that need one.
    pub fn new(
        models: Arc<dyn ModelFactory>,
        credentials: Credentials,
        config: ServerConfig,
    ) -> Result<Self> {
        let default_model = match models.create(&config.default_model) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(model = %config.default_model, error = %e, "default model unavailable");
                None
            }
        };
        let registry = build_registry(&credentials, default_model.as_ref())?;

        Ok(Self {
            models,
            credentials: Arc::new(credentials),
            registry: Arc::new(registry),
            memory: SharedMemory::new(),
            config: Arc::new(config),
            session: Arc::new(Mutex::new(None)),
        })
    }

    /// Session for `key`, reusing the current one when nothing changed.
    /// Every session records into the same [`SharedMemory`].
    pub async fn session(&self, key: SessionKey) -> Result<Arc<AgentSession>> {
        let mut current = self.session.lock().await;
        if let Some(cached) = current.as_ref().filter(|cached| cached.key == key) {
            return Ok(Arc::clone(&cached.session));
        }

        let model = self.models.create(&key.model)?;
        let registry = build_registry(&self.credentials, Some(&model))?;
        let session = AgentBuilder::new()
            .strategy(key.strategy.as_str())
            .model(key.model.as_str())
            .capabilities(key.tools.iter().map(String::as_str))
            .memory(self.memory.clone())
            .max_iterations(self.config.max_iterations)
            .build(self.models.as_ref(), &registry)?;

        for warning in session.warnings() {
            tracing::warn!(session = %session.id(), "{warning}");
        }

        let session = Arc::new(session);
        *current = Some(CachedSession {
            key,
            session: Arc::clone(&session),
        });
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use agent_core::testing::{ScriptedProvider, StaticModelFactory};

    use super::*;

    fn state() -> AppState {
        let factory = StaticModelFactory::new(ScriptedProvider::always("Final Answer: ok"));
        AppState::new(Arc::new(factory), Credentials::new(), ServerConfig::default()).unwrap()
    }

    fn key(tools: &[&str]) -> SessionKey {
        SessionKey {
            strategy: Strategy::SingleStepReasoning,
            model: "gpt-3.5-turbo".into(),
            tools: tools.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn test_session_reused_for_same_key() {
        let state = state();
        let first = state.session(key(&["wikipedia"])).await.unwrap();
        let second = state.session(key(&["wikipedia"])).await.unwrap();
        assert_eq!(first.id(), second.id());

        let third = state.session(key(&["arxiv"])).await.unwrap();
        assert_ne!(first.id(), third.id());
    }

    #[tokio::test]
    async fn test_sessions_share_memory() {
        let state = state();
        let first = state.session(key(&["wikipedia"])).await.unwrap();
        first.invoke("hello").await.unwrap();

        let second = state.session(key(&["arxiv"])).await.unwrap();
        assert_eq!(second.memory().len().await, 2);
        assert_eq!(state.memory.len().await, 2);
    }
}
