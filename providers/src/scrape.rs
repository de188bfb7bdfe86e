//! HTTP page scraper with boilerplate stripping.
//!
//! Vietnamese agricultural sites frequently serve legacy encodings
//! (windows-1258 and friends), so bytes are decoded via the charset declared
//! in the Content-Type header or a `meta charset` tag before parsing.

use crate::error::ProviderError;
use crate::traits::{PageScraper, ScrapedPage};
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

static CONTENT_NODES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, li, td, blockquote").expect("static selector")
});

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Scraper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub timeout: Duration,
    /// Pages larger than this are truncated before parsing.
    pub max_content_size: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_content_size: 2 * 1024 * 1024,
        }
    }
}

/// reqwest-backed [`PageScraper`].
pub struct HttpPageScraper {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl HttpPageScraper {
    pub fn new(config: ScraperConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }
}

impl Default for HttpPageScraper {
    fn default() -> Self {
        Self::new(ScraperConfig::default())
    }
}

#[async_trait]
impl PageScraper for HttpPageScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        if url.trim().is_empty() {
            return Err(ProviderError::InvalidInput("empty url".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ProviderError::Transient(format!(
                "scrape of {url} returned status {status}"
            )));
        }

        let header_charset = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let mut bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?
            .to_vec();
        if bytes.len() > self.config.max_content_size {
            warn!(url, size = bytes.len(), "truncating oversized page");
            bytes.truncate(self.config.max_content_size);
        }

        let page = extract_page(&bytes, header_charset.as_deref());
        debug!(url, encoding = %page.encoding, chars = page.text.len(), "page scraped");
        Ok(page)
    }
}

/// Decode bytes and strip the document down to main content text.
fn extract_page(bytes: &[u8], header_charset: Option<&str>) -> ScrapedPage {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (html, _, _) = encoding.decode(bytes);
    let text = extract_main_text(&html);

    ScrapedPage {
        text,
        encoding: encoding.name().to_lowercase(),
    }
}

/// Collect text from content-bearing nodes, dropping script/style/nav chrome.
fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    for node in document.select(&CONTENT_NODES) {
        let line = node.text().collect::<Vec<_>>().join(" ");
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn charset_from_content_type(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|cs| cs.trim_matches('"').to_string())
        .next()
}

/// Look for `<meta charset=...>` or the http-equiv variant in the head.
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]).to_lowercase();

    let label = if let Some(idx) = head.find("charset=") {
        let rest = &head[idx + "charset=".len()..];
        rest.trim_start_matches(['"', '\''])
            .split(|c: char| c == '"' || c == '\'' || c == '>' || c == ' ' || c == '/')
            .next()
            .map(str::to_string)
    } else {
        None
    }?;

    Encoding::for_label(label.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_main_text_strips_chrome() {
        let html = r#"
            <html><head><title>Trang</title><script>var x = 1;</script></head>
            <body>
              <nav><a href="/">Trang chủ</a></nav>
              <h1>Lúa ST25</h1>
              <p>Năng suất đạt   8.5 tấn/ha trong vụ Đông Xuân.</p>
              <div class="ads">Quảng cáo</div>
              <li>Thời gian sinh trưởng: 95-100 ngày</li>
            </body></html>"#;

        let text = extract_main_text(html);
        assert!(text.contains("Lúa ST25"));
        assert!(text.contains("Năng suất đạt 8.5 tấn/ha trong vụ Đông Xuân."));
        assert!(text.contains("95-100 ngày"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Quảng cáo"));
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html; charset=windows-1258"),
            Some("windows-1258".to_string())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_meta_charset_sniffing() {
        let html = br#"<html><head><meta charset="windows-1252"></head><body></body></html>"#;
        let encoding = sniff_meta_charset(html).unwrap();
        assert_eq!(encoding.name(), "windows-1252");
    }

    #[test]
    fn test_extract_page_decodes_utf8_by_default() {
        let html = "<html><body><p>Gạo ST25 thơm ngon</p></body></html>";
        let page = extract_page(html.as_bytes(), None);
        assert_eq!(page.encoding, "utf-8");
        assert!(page.text.contains("Gạo ST25 thơm ngon"));
    }
}
