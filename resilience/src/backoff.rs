//! Backoff for 429-class provider failures.
//!
//! Exponential backoff with jitter, taking the maximum with any
//! server-provided retry hint (plus a buffer, since providers round down).

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `retry in 41.3s` — plain-text hint emitted by the Gemini API.
static RETRY_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry in ([\d.]+)s").expect("static regex"));

/// `'retryDelay': '41s'` — structured hint inside quota error payloads.
static RETRY_DELAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"retryDelay'?:\s*'?(\d+)s").expect("static regex"));

/// Backoff parameters for quota retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Base delay; doubled per attempt.
    pub base: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub max_jitter: Duration,
    /// Buffer added on top of server hints.
    pub hint_buffer: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(60),
            max_jitter: Duration::from_secs(20),
            hint_buffer: Duration::from_secs(10),
        }
    }
}

/// Delay before retry number `attempt` (0-based):
/// `2^attempt * base + jitter`, raised to `hint + buffer` when the server
/// suggested a longer wait.
pub fn retry_delay(attempt: u32, config: &BackoffConfig, server_hint: Option<Duration>) -> Duration {
    let exp = 2u32.saturating_pow(attempt.min(16));
    let jitter = rand::thread_rng().gen_range(Duration::ZERO..=config.max_jitter);
    let backoff = config.base.saturating_mul(exp) + jitter;

    match server_hint {
        Some(hint) => backoff.max(hint + config.hint_buffer),
        None => backoff,
    }
}

/// Extract a retry hint out of a provider error body, if one is present.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    if let Some(caps) = RETRY_IN_RE.captures(message) {
        if let Ok(secs) = caps[1].parse::<f64>() {
            return Some(Duration::from_secs_f64(secs));
        }
    }
    if let Some(caps) = RETRY_DELAY_RE.captures(message) {
        if let Ok(secs) = caps[1].parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
    }
    None
}
