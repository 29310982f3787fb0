//! Error Types for Research Tools

use std::time::Duration;

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected response from {service}: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },

    #[error("Request blocked: {0}")]
    Blocked(String),

    #[error("Could not retrieve weather data for {location}: {cause}")]
    Weather { location: String, cause: String },

    #[error("Math error: {0}")]
    Math(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub(crate) fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }

    /// Error for a non-success HTTP status, consuming the body for context
    pub(crate) async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Status {
            service,
            status,
            body: body.chars().take(200).collect(),
        }
    }
}

impl From<ToolError> for AgentError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout(limit) => Self::Timeout(limit),
            ToolError::Io(e) => Self::Io(e),
            other => Self::Other(other.to_string()),
        }
    }
}
