//! HTTP Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use agent_core::{
    AgentError, CapabilityStatus, Message, Strategy, TraceStep, error::RETRY_GUIDANCE,
};
use agent_runtime::SUPPORTED_MODELS;
use research_tools::DEFAULT_CAPABILITIES;

use crate::state::{AppState, SessionKey};

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub available_capabilities: usize,
}

#[derive(Serialize)]
pub struct CapabilitiesResponse {
    pub capabilities: Vec<CapabilityStatus>,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: &'static [&'static str],
    pub default: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub output: String,
    pub intermediate_steps: Vec<TraceStep>,
    pub strategy: Strategy,
    pub model: String,
    pub tools: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub guidance: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::UnknownStrategy(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_STRATEGY"),
        AgentError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
        AgentError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        AgentError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        AgentError::Auth(_) | AgentError::Provider(_) | AgentError::ProviderUnavailable(_) => {
            (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    tracing::warn!(code, retryable = err.is_retryable(), error = %err, "request failed");

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
            guidance: RETRY_GUIDANCE,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        available_capabilities: state.registry.available_names().len(),
    })
}

/// Every registered capability with its availability
pub async fn list_capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: state.registry.status(),
    })
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: SUPPORTED_MODELS,
        default: state.config.default_model.clone(),
    })
}

/// Run one turn. Failures answer with an error body; the session and its
/// memory stay usable for the next request.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Message cannot be empty".into(),
                code: "EMPTY_MESSAGE".into(),
                guidance: RETRY_GUIDANCE,
            }),
        ));
    }

    let strategy = match payload.strategy.as_deref() {
        Some(tag) => tag.parse::<Strategy>().map_err(|e| error_response(&e))?,
        None => state.config.default_strategy,
    };
    let key = SessionKey {
        strategy,
        model: payload
            .model
            .unwrap_or_else(|| state.config.default_model.clone()),
        tools: payload.tools.unwrap_or_else(|| {
            DEFAULT_CAPABILITIES
                .iter()
                .map(ToString::to_string)
                .collect()
        }),
    };

    let session = state.session(key).await.map_err(|e| error_response(&e))?;
    let result = session
        .invoke_with_timeout(message, state.config.invoke_timeout)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(ChatResponse {
        output: result.output,
        intermediate_steps: result.intermediate_steps,
        strategy: session.strategy(),
        model: session.model_id().to_string(),
        tools: session
            .capability_names()
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        warnings: session.warnings().to_vec(),
    }))
}

pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        messages: state.memory.snapshot().await,
    })
}

/// Clear the shared memory; the current session keeps working
pub async fn clear_history(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.memory.len().await;
    state.memory.clear().await;
    tracing::info!(cleared, "conversation memory cleared");
    Json(ClearResponse { cleared })
}
