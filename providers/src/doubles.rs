//! Deterministic provider doubles for tests.
//!
//! These live in the library (not behind `cfg(test)`) so every downstream
//! crate can exercise the pipeline without network access.

use crate::error::ProviderError;
use crate::traits::{EmbeddingProvider, LlmCompleter, PageScraper, ScrapedPage, SearchProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

/// Completer that replays a scripted sequence of responses, falling back to a
/// fixed default once the script is exhausted.
#[derive(Default)]
pub struct StaticCompleter {
    scripted: Mutex<VecDeque<Result<String, ProviderError>>>,
    default_response: Option<String>,
    rate_limit_default: Option<Option<std::time::Duration>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticCompleter {
    /// Replay `responses` in order, then fail with `Transient`.
    pub fn scripted(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            scripted: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Always return the same completion.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            default_response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Always fail with a 429 carrying `retry_after`.
    pub fn always_rate_limited(retry_after: Option<std::time::Duration>) -> Self {
        Self {
            rate_limit_default: Some(retry_after),
            ..Self::default()
        }
    }

    /// Number of completions performed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Prompts seen so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    fn rate_limited_error(retry_after: Option<std::time::Duration>) -> ProviderError {
        ProviderError::RateLimited {
            message: "scripted 429".to_string(),
            retry_after,
        }
    }
}

#[async_trait]
impl LlmCompleter for StaticCompleter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if let Some(next) = self.scripted.lock().pop_front() {
            return next;
        }
        if let Some(rate_limit) = &self.rate_limit_default {
            return Err(Self::rate_limited_error(*rate_limit));
        }
        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(ProviderError::Transient(
                "no scripted response left".to_string(),
            )),
        }
    }
}

/// Embedder with an explicit text -> vector mapping. Unmapped texts fail,
/// which downstream code treats as "embedding unavailable".
#[derive(Default)]
pub struct MappedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl MappedEmbedder {
    pub fn new(vectors: HashMap<String, Vec<f32>>) -> Self {
        Self { vectors }
    }

    pub fn insert(&mut self, text: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(text.into(), vector);
    }
}

#[async_trait]
impl EmbeddingProvider for MappedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| ProviderError::Transient(format!("no mapped vector for {text:?}")))
    }
}

/// Deterministic hash-based embedder: identical text always embeds to the
/// identical vector, so exact-duplicate similarity is 1.0 without a model.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        let vector = (0..self.dimension)
            .map(|i| {
                let seed = hash.wrapping_add(i as u64).wrapping_mul(0x9E3779B97F4A7C15);
                let normalized = (seed % 1000) as f32 / 1000.0;
                normalized * 2.0 - 1.0
            })
            .collect();
        Ok(vector)
    }
}

/// Search double replaying scripted result lists per call.
#[derive(Default)]
pub struct StaticSearch {
    scripted: Mutex<VecDeque<Vec<String>>>,
    default_results: Vec<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    /// Always return the same URL list.
    pub fn returning(urls: Vec<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default_results: urls,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Replay `results` in call order, then fall back to empty lists.
    pub fn scripted(results: Vec<Vec<String>>) -> Self {
        Self {
            scripted: Mutex::new(results.into()),
            default_results: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(
        &self,
        query: &str,
        _region: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        self.queries.lock().push(query.to_string());
        if let Some(next) = self.scripted.lock().pop_front() {
            return Ok(next);
        }
        Ok(self.default_results.clone())
    }
}

/// Scraper double serving canned page text per URL. Unknown URLs scrape to
/// empty text; URLs in `failing` error out.
#[derive(Default)]
pub struct StaticScraper {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
}

impl StaticScraper {
    pub fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            failing: HashSet::new(),
        }
    }

    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }
}

#[async_trait]
impl PageScraper for StaticScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        if self.failing.contains(url) {
            return Err(ProviderError::Transient(format!("scripted failure for {url}")));
        }
        Ok(self
            .pages
            .get(url)
            .map(|text| ScrapedPage {
                text: text.clone(),
                encoding: "utf-8".to_string(),
            })
            .unwrap_or_else(ScrapedPage::empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_completer_scripted_then_default_error() {
        let completer = StaticCompleter::scripted(vec![Ok("[]".to_string())]);
        assert_eq!(completer.complete("s", "u").await.unwrap(), "[]");
        assert!(completer.complete("s", "u").await.is_err());
        assert_eq!(completer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_always_rate_limited() {
        let completer =
            StaticCompleter::always_rate_limited(Some(std::time::Duration::from_secs(5)));
        let err = completer.complete("s", "u").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("8.5 tấn/ha").await.unwrap();
        let b = embedder.embed("8.5 tấn/ha").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_mapped_embedder_unknown_text_errors() {
        let embedder = MappedEmbedder::default();
        assert!(embedder.embed("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_static_search_scripted_sequence() {
        let search = StaticSearch::scripted(vec![vec![], vec!["https://a.vn".to_string()]]);
        assert!(search.search("q1", None).await.unwrap().is_empty());
        assert_eq!(search.search("q2", None).await.unwrap().len(), 1);
        assert_eq!(search.queries(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn test_static_scraper_pages_and_failures() {
        let mut pages = HashMap::new();
        pages.insert("https://a.vn".to_string(), "nội dung".to_string());
        let scraper = StaticScraper::new(pages).with_failure("https://bad.vn");

        assert_eq!(scraper.scrape("https://a.vn").await.unwrap().text, "nội dung");
        assert_eq!(scraper.scrape("https://other.vn").await.unwrap().text, "");
        assert!(scraper.scrape("https://bad.vn").await.is_err());
    }
}
