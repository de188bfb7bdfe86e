//! Capability traits implemented by concrete providers and test doubles.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text completion against a large language model.
#[async_trait]
pub trait LlmCompleter: Send + Sync {
    /// Run one completion. Implementations classify failures into
    /// [`ProviderError`] so the caller can drive backoff and breaker logic.
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ProviderError>;
}

/// Text embedding provider. The judge downgrades to string similarity when no
/// embedder is wired in, so implementations are always optional.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Web search: query in, result URLs out. Providers that do not understand
/// the region parameter ignore it.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, region: Option<&str>)
        -> Result<Vec<String>, ProviderError>;
}

/// Clean text recovered from a web page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub text: String,
    pub encoding: String,
}

impl ScrapedPage {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            encoding: "utf-8".to_string(),
        }
    }
}

/// Fetch a URL and strip boilerplate down to main text. Failures yield empty
/// text at the workflow layer, never exceptions that abort a batch.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError>;
}
