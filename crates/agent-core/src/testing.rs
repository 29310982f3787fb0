//! Deterministic providers for tests.
//!
//! Enabled inside this crate's tests and, for downstream crates, through
//! the `testing` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider, ModelFactory, ModelHandle};

type Responder = dyn Fn(&[Message]) -> String + Send + Sync;

enum Script {
    Sequence(Vec<String>),
    Respond(Box<Responder>),
    Fail(String),
}

struct Inner {
    script: Script,
    calls: AtomicUsize,
}

/// Replays canned responses. Honors stop sequences like a real backend.
#[derive(Clone)]
pub struct ScriptedProvider {
    inner: Arc<Inner>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            inner: Arc::new(Inner {
                script,
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Same response on every call
    pub fn always(response: impl Into<String>) -> Self {
        Self::sequence([response.into()])
    }

    /// Responses in order; the last one repeats once exhausted
    pub fn sequence<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Sequence(responses.into_iter().map(Into::into).collect()))
    }

    /// Response computed from the transcript
    pub fn respond<F>(func: F) -> Self
    where
        F: Fn(&[Message]) -> String + Send + Sync + 'static,
    {
        Self::with_script(Script::Respond(Box::new(func)))
    }

    /// Every call fails with a provider error
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Wrap in a handle for `model`
    pub fn handle(&self, model: &str) -> ModelHandle {
        ModelHandle::new(
            Arc::new(self.clone()),
            GenerationOptions {
                model: model.into(),
                ..Default::default()
            },
        )
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let call = self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let mut text = match &self.inner.script {
            Script::Sequence(responses) => responses
                .get(call)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or_default(),
            Script::Respond(func) => func(messages),
            Script::Fail(message) => return Err(AgentError::Provider(message.clone())),
        };

        if let Some(cut) = options
            .stop_sequences
            .iter()
            .filter_map(|stop| text.find(stop.as_str()))
            .min()
        {
            text.truncate(cut);
        }

        Ok(Completion::text(&options.model, text))
    }
}

/// Hands out handles to one provider for every model id
pub struct StaticModelFactory {
    provider: ScriptedProvider,
}

impl StaticModelFactory {
    pub const fn new(provider: ScriptedProvider) -> Self {
        Self { provider }
    }
}

impl ModelFactory for StaticModelFactory {
    fn create(&self, model_id: &str) -> Result<ModelHandle> {
        Ok(self.provider.handle(model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let provider = ScriptedProvider::sequence(["a", "b"]);
        let options = GenerationOptions::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(provider.complete(&[], &options).await.unwrap().content);
        }
        assert_eq!(seen, vec!["a", "b", "b"]);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_stop_sequences_truncate() {
        let provider = ScriptedProvider::always("Action: x\nAction Input: y\nObservation: z");
        let options = GenerationOptions {
            stop_sequences: vec!["\nObservation:".into()],
            ..Default::default()
        };
        let out = provider.complete(&[], &options).await.unwrap();
        assert_eq!(out.content, "Action: x\nAction Input: y");
    }
}
