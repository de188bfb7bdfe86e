//! Web search providers: DuckDuckGo (primary) and Tavily (fallback).

use crate::error::ProviderError;
use crate::traits::SearchProvider;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

static RESULT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("static selector"));

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Search against the DuckDuckGo HTML endpoint. The `region` parameter maps
/// to the `kl` query argument ("vn-vi" improves Vietnamese results markedly).
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration, max_results: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            max_results,
        }
    }

    /// Result anchors point at a redirect URL carrying the target in the
    /// `uddg` query parameter; direct links pass through unchanged.
    fn resolve_href(href: &str) -> Option<String> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(href.to_string());
        }

        let absolute = if href.starts_with("//") {
            format!("https:{href}")
        } else {
            return None;
        };

        let parsed = Url::parse(&absolute).ok()?;
        parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 15)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        region: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        let mut request = self
            .client
            .get("https://html.duckduckgo.com/html/")
            .query(&[("q", query)]);
        if let Some(region) = region {
            request = request.query(&[("kl", region)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited {
                message: "duckduckgo rate limit".to_string(),
                retry_after: None,
            });
        }
        if !(200..300).contains(&status) {
            return Err(ProviderError::Transient(format!(
                "duckduckgo returned status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let document = Html::parse_document(&body);
        let mut urls = Vec::new();
        for anchor in document.select(&RESULT_LINK) {
            if let Some(href) = anchor.value().attr("href") {
                if let Some(resolved) = Self::resolve_href(href) {
                    urls.push(resolved);
                    if urls.len() >= self.max_results {
                        break;
                    }
                }
            }
        }

        debug!(query, region = region.unwrap_or("default"), count = urls.len(), "duckduckgo search done");
        Ok(urls)
    }
}

/// Tavily search API, used as the final fallback when DuckDuckGo yields
/// nothing. Requires `TAVILY_API_KEY`.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, timeout: Duration, max_results: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.into(),
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        _region: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": self.max_results,
            "search_depth": "basic"
        });

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ProviderError::Transient(format!(
                "tavily returned status {status}"
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let urls = value["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| r["url"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_direct_href() {
        assert_eq!(
            DuckDuckGoSearch::resolve_href("https://nongnghiep.vn/lua-st25"),
            Some("https://nongnghiep.vn/lua-st25".to_string())
        );
    }

    #[test]
    fn test_resolve_redirect_href() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fvnexpress.net%2Flua%2Dst25&rut=abc";
        assert_eq!(
            DuckDuckGoSearch::resolve_href(href),
            Some("https://vnexpress.net/lua-st25".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_relative_href() {
        assert_eq!(DuckDuckGoSearch::resolve_href("/html/?q=next"), None);
    }
}
