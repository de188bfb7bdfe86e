//! Search stage: query building, the fallback ladder and URL filtering.

use crate::state::DebugInfo;
use agri_providers::SearchProvider;
use serde::{Deserialize, Serialize};
use source_trust::TrustTable;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Search stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Region hint passed to the primary provider ("vn-vi" for Vietnamese).
    pub region: String,
    /// Hosts dropped outright (substring match against the hostname).
    pub blocked_hosts: Vec<String>,
    /// Minimum trust score to keep a URL; relaxed when it would empty the list.
    pub min_trust: f64,
    /// Hard cap on URLs handed to extraction.
    pub max_urls: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            region: "vn-vi".to_string(),
            blocked_hosts: ["vfo.vn", "zhihu.com", "yahoo", "seek.com", "forum"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            min_trust: 0.3,
            max_urls: 15,
        }
    }
}

/// Default Vietnamese query for a crop; generic when no crop was given.
pub fn build_search_query(crop: &str) -> String {
    let crop = crop.trim();
    if crop.is_empty() {
        return "giống lúa năng suất cao ĐBSCL".to_string();
    }
    format!("{crop} năng suất giống lúa")
}

/// URL discovery with a documented fallback ladder.
pub struct SearchStage {
    provider: Arc<dyn SearchProvider>,
    /// Secondary provider used when every primary query comes back empty.
    fallback_provider: Option<Arc<dyn SearchProvider>>,
    trust: Arc<TrustTable>,
    config: SearchConfig,
}

impl SearchStage {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        fallback_provider: Option<Arc<dyn SearchProvider>>,
        trust: Arc<TrustTable>,
        config: SearchConfig,
    ) -> Self {
        Self {
            provider,
            fallback_provider,
            trust,
            config,
        }
    }

    /// Run the ladder until some query yields URLs, then filter and cap.
    pub async fn run(&self, crop: &str, query: &str, debug_info: &mut DebugInfo) -> Vec<String> {
        let region = Some(self.config.region.as_str());
        let mut urls = self.try_search(query, region, debug_info).await;

        let crop = crop.trim();
        if urls.is_empty() && !crop.is_empty() {
            let ladder: [(String, Option<&str>); 4] = [
                (format!("{crop} năng suất"), region),
                (crop.to_string(), region),
                (format!("{crop} rice yield Vietnam"), None),
                (format!("{crop} rice variety Vietnam"), None),
            ];

            for (fallback_query, fallback_region) in ladder {
                debug_info.fallback_queries.push(fallback_query.clone());
                urls = self
                    .try_search(&fallback_query, fallback_region, debug_info)
                    .await;
                if !urls.is_empty() {
                    break;
                }
            }

            if urls.is_empty() {
                if let Some(fallback) = &self.fallback_provider {
                    let fallback_query = build_search_query(crop);
                    debug_info.fallback_queries.push(fallback_query.clone());
                    match fallback.search(&fallback_query, None).await {
                        Ok(found) => urls = found,
                        Err(e) => debug_info
                            .errors
                            .push(format!("Fallback search error for '{fallback_query}': {e}")),
                    }
                }
            }
        }

        let deduped = self.filter_and_dedup(urls);
        debug_info.num_urls_after_dedup = deduped.len();

        let trusted: Vec<String> = deduped
            .iter()
            .filter(|u| self.trust.score(u) >= self.config.min_trust)
            .cloned()
            .collect();
        debug_info.num_urls_after_trust_filter = trusted.len();

        // An empty trust filter result falls back to the deduped list.
        let mut final_urls = if trusted.is_empty() { deduped } else { trusted };
        final_urls.truncate(self.config.max_urls);

        debug_info.num_search_results = final_urls.len();
        info!(urls = final_urls.len(), "search stage complete");
        final_urls
    }

    async fn try_search(
        &self,
        query: &str,
        region: Option<&str>,
        debug_info: &mut DebugInfo,
    ) -> Vec<String> {
        match self.provider.search(query, region).await {
            Ok(urls) => {
                debug!(query, region = region.unwrap_or("default"), count = urls.len(), "search attempt");
                urls
            }
            Err(e) => {
                debug_info.errors.push(format!(
                    "Search error for query '{query}' (region={}): {e}",
                    region.unwrap_or("default")
                ));
                Vec::new()
            }
        }
    }

    /// Drop invalid and blocklisted URLs, de-duplicate preserving order.
    fn filter_and_dedup(&self, urls: Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        for url in urls {
            let url = url.trim().to_string();
            if url.is_empty() || out.contains(&url) {
                continue;
            }

            let Ok(parsed) = Url::parse(&url) else {
                continue;
            };
            if !matches!(parsed.scheme(), "http" | "https") {
                continue;
            }
            let Some(host) = parsed.host_str() else {
                continue;
            };
            let host = host.to_lowercase();
            if self
                .config
                .blocked_hosts
                .iter()
                .any(|blocked| host.contains(blocked))
            {
                continue;
            }

            out.push(url);
        }

        out
    }
}
