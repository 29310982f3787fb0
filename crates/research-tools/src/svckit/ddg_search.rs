//! DuckDuckGo Search Capability
//!
//! Scrapes the DuckDuckGo HTML endpoint, which needs no API key.

use async_trait::async_trait;
use scraper::{Html, Selector};

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 5;

#[derive(Debug, PartialEq, Eq)]
struct SearchResult {
    title: String,
    body: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ToolError::malformed("ddg-search", format!("selector {css}: {e}")))
}

fn parse_results(html: &str) -> Result<Vec<SearchResult>> {
    if html.contains("anomaly-modal") || html.contains("select all squares containing") {
        return Err(ToolError::Blocked(
            "DuckDuckGo bot detection triggered, try again in a few minutes".into(),
        ));
    }

    let document = Html::parse_document(html);
    let result_sel = selector(".result")?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        let is_ad = element
            .value()
            .attr("class")
            .is_some_and(|class| class.contains("result--ad"));
        if is_ad {
            continue;
        }

        let Some(title) = element.select(&title_sel).next() else {
            continue;
        };
        let title = title.text().collect::<String>().trim().to_string();
        let body = element
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        if !title.is_empty() {
            results.push(SearchResult { title, body });
        }
        if results.len() >= MAX_RESULTS {
            break;
        }
    }

    Ok(results)
}

/// One `title: body` line per result
fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("{}: {}", r.title, r.body))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct DdgSearch {
    client: reqwest::Client,
}

impl DdgSearch {
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(SEARCH_URL)
            .form(&[("q", query), ("kl", "wt-wt")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolError::from_response("ddg-search", response).await);
        }

        let html = response.text().await?;
        let results = parse_results(&html)?;
        tracing::debug!(query = %query, results = results.len(), "ddg search complete");
        Ok(format_results(&results))
    }
}

#[async_trait]
impl Capability for DdgSearch {
    async fn run(&self, input: &str) -> CoreResult<String> {
        Ok(self.search(input.trim()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, snippet: &str, extra_class: &str) -> String {
        format!(
            r#"<div class="result results_links {extra_class}">
                 <h2 class="result__title"><a class="result__a" href="//duckduckgo.com/l/?uddg=x">{title}</a></h2>
                 <a class="result__snippet">{snippet}</a>
               </div>"#
        )
    }

    #[test]
    fn test_parse_skips_ads_and_caps_results() {
        let mut html = String::from("<html><body>");
        html.push_str(&result("Sponsored", "Buy now", "result--ad"));
        for i in 0..7 {
            html.push_str(&result(&format!("Rust {i}"), "A language", ""));
        }
        html.push_str("</body></html>");

        let results = parse_results(&html).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].title, "Rust 0");
        assert_eq!(format_results(&results[..1]), "Rust 0: A language");
    }

    #[test]
    fn test_captcha_is_an_error() {
        let html = r#"<div class="anomaly-modal">select all squares containing a duck</div>"#;
        assert!(matches!(parse_results(html), Err(ToolError::Blocked(_))));
    }

    #[test]
    fn test_no_results_is_empty() {
        let results = parse_results("<html><body><div class='no-results'></div></body></html>").unwrap();
        assert!(format_results(&results).is_empty());
    }
}
