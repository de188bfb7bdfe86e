//! Provider capability interfaces for the claim fusion pipeline.
//!
//! Small traits (`LlmCompleter`, `EmbeddingProvider`, `SearchProvider`,
//! `PageScraper`) decouple the pipeline from concrete vendors and enable
//! deterministic doubles in tests. HTTP implementations target the Google
//! Generative Language API, DuckDuckGo and Tavily.

pub mod doubles;
pub mod error;
pub mod gemini;
pub mod scrape;
pub mod search;
pub mod traits;

pub use doubles::{HashEmbedder, MappedEmbedder, StaticCompleter, StaticScraper, StaticSearch};
pub use error::ProviderError;
pub use gemini::{GeminiCompleter, GeminiConfig, GeminiEmbedder};
pub use scrape::{HttpPageScraper, ScraperConfig};
pub use search::{DuckDuckGoSearch, TavilySearch};
pub use traits::{EmbeddingProvider, LlmCompleter, PageScraper, ScrapedPage, SearchProvider};
