//! Google Custom Search Capability

use async_trait::async_trait;
use serde::Deserialize;

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const API_URL: &str = "https://www.googleapis.com/customsearch/v1";
const NUM_RESULTS: &str = "5";
/// Restrict results to the last 12 months
const DATE_RESTRICT: &str = "m12";

pub const NO_RESULT: &str = "No good Google Search Result was found";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    snippet: Option<String>,
}

fn format_snippets(response: &SearchResponse) -> String {
    let snippets: Vec<&str> = response
        .items
        .iter()
        .filter_map(|item| item.snippet.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if snippets.is_empty() {
        NO_RESULT.into()
    } else {
        snippets.join(" ")
    }
}

pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    cse_id: String,
}

impl GoogleSearch {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cse_id: cse_id.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", NUM_RESULTS),
                ("dateRestrict", DATE_RESTRICT),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::from_response("google-search", response).await);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::malformed("google-search", e.to_string()))?;
        Ok(format_snippets(&body))
    }
}

#[async_trait]
impl Capability for GoogleSearch {
    async fn run(&self, input: &str) -> CoreResult<String> {
        Ok(self.search(input.trim()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippets_joined() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"items": [{"title": "a", "snippet": "First."}, {"title": "b"}, {"snippet": " Second. "}]}"#,
        )
        .unwrap();
        assert_eq!(format_snippets(&body), "First. Second.");
    }

    #[test]
    fn test_no_items() {
        let body: SearchResponse = serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert_eq!(format_snippets(&body), NO_RESULT);
    }
}
