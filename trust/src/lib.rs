//! Trust scoring for source URLs.
//!
//! Maps a URL to a weight in [0, 1] from its host alone:
//! - `.gov.vn` government domains score 1.0
//! - `.edu.vn` education domains score 0.9
//! - hosts on the official-press allowlist score their configured value (0.8)
//! - everything else, including empty or unparseable URLs, scores 0.5

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Default score for unknown or missing sources.
pub const DEFAULT_TRUST: f64 = 0.5;

/// Trust table: the official-press allowlist plus the fixed domain rules.
///
/// The table is loaded as configuration at startup; the seeded values are
/// contractual and pinned by tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustTable {
    /// Exact hostname -> score for curated mainstream Vietnamese press.
    pub official_press: HashMap<String, f64>,
}

impl Default for TrustTable {
    fn default() -> Self {
        let official_press = [
            "vnexpress.net",
            "tuoitre.vn",
            "thanhnien.vn",
            "nld.com.vn",
            "dantri.com.vn",
            "vietnamplus.vn",
            "vtv.vn",
            "vov.vn",
            "baochinhphu.vn",
            "nongnghiep.vn",
        ]
        .into_iter()
        .map(|host| (host.to_string(), 0.8))
        .collect();

        Self { official_press }
    }
}

impl TrustTable {
    /// Score a source URL. Pure: no I/O, no failure modes.
    pub fn score(&self, url: &str) -> f64 {
        let url = url.trim();
        if url.is_empty() {
            return DEFAULT_TRUST;
        }

        let host = match extract_host(url) {
            Some(host) => host,
            None => return DEFAULT_TRUST,
        };

        if host.ends_with(".gov.vn") {
            return 1.0;
        }
        if host.ends_with(".edu.vn") {
            return 0.9;
        }
        if let Some(score) = self.official_press.get(&host) {
            return *score;
        }

        DEFAULT_TRUST
    }
}

/// Lowercased hostname with any port stripped. URLs missing a scheme are
/// retried with an `https://` prefix so bare domains still resolve to a host.
fn extract_host(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        // A bare "host:port" parses as scheme:path with no host; fall through.
        if let Some(host) = parsed.host_str() {
            return Some(host.to_lowercase());
        }
    }
    let parsed = Url::parse(&format!("https://{}", url)).ok()?;
    parsed.host_str().map(|h| h.to_lowercase())
}
