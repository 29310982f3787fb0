//! Wikipedia Capability
//!
//! Full-text search over English Wikipedia, returning the introduction of
//! the top pages.

use async_trait::async_trait;
use serde::Deserialize;

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const TOP_K: usize = 3;
const MAX_CHARS: usize = 4000;

pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Debug, Default, Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: String,
}

/// `Page:`/`Summary:` blocks in search rank order
fn format_pages(response: QueryResponse) -> String {
    let mut pages = response.query.map(|q| q.pages).unwrap_or_default();
    pages.sort_by_key(|p| p.index);

    let summaries: Vec<String> = pages
        .into_iter()
        .filter(|p| !p.extract.trim().is_empty())
        .take(TOP_K)
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
        .collect();

    if summaries.is_empty() {
        return NO_RESULT.into();
    }
    summaries.join("\n\n").chars().take(MAX_CHARS).collect()
}

pub struct Wikipedia {
    client: reqwest::Client,
}

impl Wikipedia {
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let limit = TOP_K.to_string();
        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::from_response("wikipedia", response).await);
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ToolError::malformed("wikipedia", e.to_string()))?;
        Ok(format_pages(body))
    }
}

#[async_trait]
impl Capability for Wikipedia {
    async fn run(&self, input: &str) -> CoreResult<String> {
        Ok(self.search(input.trim()).await?)
    }
}
