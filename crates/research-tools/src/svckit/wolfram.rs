//! Wolfram|Alpha Capability
//!
//! Uses the Short Answers API, which returns a single plain-text result.

use async_trait::async_trait;
use reqwest::StatusCode;

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const API_URL: &str = "https://api.wolframalpha.com/v1/result";

pub const FAILURE_HINT: &str = "Please try a different tool or rephrase your query.";

pub struct WolframAlpha {
    client: reqwest::Client,
    app_id: String,
}

impl WolframAlpha {
    pub fn new(client: reqwest::Client, app_id: impl Into<String>) -> Self {
        Self {
            client,
            app_id: app_id.into(),
        }
    }

    async fn query(&self, input: &str) -> Result<String> {
        let response = self
            .client
            .get(API_URL)
            .query(&[("appid", self.app_id.as_str()), ("i", input), ("units", "metric")])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.text().await?),
            // 501: the input could not be interpreted
            StatusCode::NOT_IMPLEMENTED => Err(ToolError::malformed(
                "wolfram-alpha",
                "Wolfram Alpha did not understand the input",
            )),
            _ => Err(ToolError::from_response("wolfram-alpha", response).await),
        }
    }
}

#[async_trait]
impl Capability for WolframAlpha {
    async fn run(&self, input: &str) -> CoreResult<String> {
        Ok(self.query(input.trim()).await?)
    }

    fn failure_hint(&self) -> Option<&str> {
        Some(FAILURE_HINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_hint() {
        let wolfram = WolframAlpha::new(reqwest::Client::new(), "demo");
        assert_eq!(wolfram.failure_hint(), Some(FAILURE_HINT));
    }
}
