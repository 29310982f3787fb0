//! arXiv Capability
//!
//! Queries the arXiv Atom API and summarizes the top entries.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const API_URL: &str = "https://export.arxiv.org/api/query";
const TOP_K: usize = 3;
const MAX_CHARS: usize = 4000;

pub const NO_RESULT: &str = "No good Arxiv Result was found";

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ToolError::malformed("arxiv", format!("selector {css}: {e}")))
}

/// Text of the first matching child, whitespace collapsed
fn child_text(element: &ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|node| node.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn parse_feed(xml: &str) -> Result<Vec<Entry>> {
    let document = Html::parse_document(xml);
    let entry_sel = selector("entry")?;
    let title_sel = selector("title")?;
    let summary_sel = selector("summary")?;
    let published_sel = selector("published")?;
    let author_sel = selector("author > name")?;

    Ok(document
        .select(&entry_sel)
        .map(|entry| Entry {
            published: child_text(&entry, &published_sel)
                .split('T')
                .next()
                .unwrap_or_default()
                .to_string(),
            title: child_text(&entry, &title_sel),
            authors: entry
                .select(&author_sel)
                .map(|n| n.text().collect::<String>().trim().to_string())
                .collect(),
            summary: child_text(&entry, &summary_sel),
        })
        .filter(|entry| !entry.title.is_empty())
        .take(TOP_K)
        .collect())
}

fn format_entries(entries: &[Entry]) -> String {
    if entries.is_empty() {
        return NO_RESULT.into();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                e.published,
                e.title,
                e.authors.join(", "),
                e.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .chars()
        .take(MAX_CHARS)
        .collect()
}

pub struct Arxiv {
    client: reqwest::Client,
}

impl Arxiv {
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let search = format!("all:{query}");
        let limit = TOP_K.to_string();
        let response = self
            .client
            .get(API_URL)
            .query(&[("search_query", search.as_str()), ("max_results", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::from_response("arxiv", response).await);
        }

        let xml = response.text().await?;
        Ok(format_entries(&parse_feed(&xml)?))
    }
}

#[async_trait]
impl Capability for Arxiv {
    async fn run(&self, input: &str) -> CoreResult<String> {
        Ok(self.search(input.trim()).await?)
    }
}
