//! Centralized configuration.
//!
//! Settings layer an optional `agri.toml` file under `AGRI_`-prefixed
//! environment variables (e.g. `AGRI_SEARCH__MAX_URLS=10`). Provider secrets
//! (`GOOGLE_API_KEY`, `TAVILY_API_KEY`) are read from the plain environment,
//! never from the config file.

use serde::{Deserialize, Serialize};
use source_trust::TrustTable;
use tracing::debug;

/// Configuration load errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration invalid: {0}")]
    Invalid(String),
}

/// LLM settings. Temperature defaults differ per role: extraction runs a
/// slightly creative 0.3, the judge a near-deterministic 0.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub embedding_model: String,
    pub extraction_temperature: f32,
    pub judge_temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            extraction_temperature: 0.3,
            judge_temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

/// Search stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub region: String,
    pub blocked_hosts: Vec<String>,
    pub min_trust: f64,
    pub max_urls: usize,
}

impl Default for SearchSettings {
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

/// Rate limiter and circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_timeout_secs: u64,
    pub breaker_half_open_max: u32,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 8,
            rate_limit_window_ms: 1000,
            breaker_failure_threshold: 3,
            breaker_timeout_secs: 120,
            breaker_half_open_max: 3,
        }
    }
}

/// Extraction chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_retries: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            chunk_threshold: 3000,
            chunk_size: 3000,
            overlap: 200,
            max_retries: 1,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub resilience: ResilienceSettings,
    pub extraction: ExtractionSettings,
    /// Trust table; contractual values, overridable without code changes.
    pub trust: TrustTable,
    pub judge_cache_dir: Option<String>,
}

impl AppConfig {
    /// Load `agri.toml` (optional) layered under `AGRI_*` env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("agri")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix("AGRI").separator("__"))
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let loaded: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        debug!(model = %loaded.llm.model, "configuration loaded");
        Ok(loaded)
    }

    /// Judge cache location, defaulting next to the working directory.
    pub fn judge_cache_dir(&self) -> String {
        self.judge_cache_dir
            .clone()
            .unwrap_or_else(|| "data/judge_cache".to_string())
    }
}

/// `GOOGLE_API_KEY`, required when LLM or embedding calls are enabled.
pub fn google_api_key() -> Option<String> {
    std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty())
}

/// `TAVILY_API_KEY`, optional; enables the final search fallback.
pub fn tavily_api_key() -> Option<String> {
    std::env::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_contractual() {
        let config = AppConfig::default();
        assert_eq!(config.resilience.rate_limit_max_requests, 8);
        assert_eq!(config.resilience.breaker_failure_threshold, 3);
        assert_eq!(config.resilience.breaker_timeout_secs, 120);
        assert_eq!(config.extraction.chunk_size, 3000);
        assert_eq!(config.extraction.overlap, 200);
        assert_eq!(config.search.max_urls, 15);
        assert_eq!(config.trust.score("https://vnexpress.net/x"), 0.8);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agri.toml");
        std::fs::write(
            &path,
            "[search]\nmax_urls = 5\n\n[llm]\nmodel = \"gemini-2.5-flash-lite\"\n",
        )
        .unwrap();

        let stem = path.with_extension("");
        let config = AppConfig::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(config.search.max_urls, 5);
        assert_eq!(config.llm.model, "gemini-2.5-flash-lite");
        // Untouched sections keep their defaults.
        assert_eq!(config.extraction.chunk_size, 3000);
    }
}
