//! Google Generative Language API client (completion + embedding).
//!
//! Requires `GOOGLE_API_KEY`. 429 payloads are mined for retry hints so the
//! extraction backoff can honor the server's suggestion.

use crate::error::ProviderError;
use crate::traits::{EmbeddingProvider, LlmCompleter};
use agri_resilience::parse_retry_hint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the Gemini API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map an HTTP status + body to the provider error taxonomy.
fn classify_response(status: u16, body: &str) -> ProviderError {
    let lowered = body.to_lowercase();
    let quota_shaped =
        lowered.contains("resource_exhausted") || lowered.contains("quota");

    match status {
        429 => ProviderError::RateLimited {
            message: body.to_string(),
            retry_after: parse_retry_hint(body),
        },
        401 | 403 => ProviderError::Fatal(format!("authentication rejected ({status}): {body}")),
        400 => ProviderError::InvalidInput(body.to_string()),
        _ if quota_shaped => ProviderError::RateLimited {
            message: body.to_string(),
            retry_after: parse_retry_hint(body),
        },
        500..=599 => ProviderError::Transient(format!("server error ({status}): {body}")),
        _ => ProviderError::Transient(format!("unexpected status {status}: {body}")),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transient(format!("request timeout: {err}"))
    } else {
        ProviderError::Transient(err.to_string())
    }
}

/// Completion client for Gemini `generateContent`.
pub struct GeminiCompleter {
    client: reqwest::Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiCompleter {
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Self {
        Self {
            client: build_client(config.timeout),
            api_key: api_key.into(),
            config,
        }
    }
}

#[async_trait]
impl LlmCompleter for GeminiCompleter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        let body = json!({
            "system_instruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
            "generationConfig": { "temperature": self.config.temperature }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        let payload = response.text().await.map_err(classify_transport)?;

        if !(200..300).contains(&status) {
            return Err(classify_response(status, &payload));
        }

        let value: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| ProviderError::Transient(format!("malformed completion payload: {e}")))?;

        let text = value["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        debug!(model = %self.config.model, chars = text.len(), "gemini completion received");
        Ok(text)
    }
}

/// Embedding client for Gemini `embedContent`.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Self {
        Self {
            client: build_client(config.timeout),
            api_key: api_key.into(),
            config,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.config.base_url, self.config.embedding_model, self.api_key
        );

        let body = json!({
            "model": format!("models/{}", self.config.embedding_model),
            "content": { "parts": [{ "text": text }] }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        let payload = response.text().await.map_err(classify_transport)?;

        if !(200..300).contains(&status) {
            return Err(classify_response(status, &payload));
        }

        let value: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| ProviderError::Transient(format!("malformed embedding payload: {e}")))?;

        let vector = value["embedding"]["values"]
            .as_array()
            .ok_or_else(|| ProviderError::Transient("embedding payload missing values".into()))?
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect();

        Ok(vector)
    }
}
