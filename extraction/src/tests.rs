//! Extractor tests against scripted providers.

use crate::extractor::{ClaimExtractor, ExtractorConfig};
use agri_providers::{ProviderError, StaticCompleter, StaticScraper};
use agri_resilience::{BackoffConfig, CircuitBreaker, CircuitBreakerConfig, RateLimiter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> ExtractorConfig {
    ExtractorConfig {
        chunk_threshold: 3000,
        chunk_size: 3000,
        overlap: 200,
        max_retries: 1,
        backoff: BackoffConfig {
            base: Duration::from_millis(5),
            max_jitter: Duration::from_millis(1),
            hint_buffer: Duration::from_millis(1),
        },
    }
}

fn extractor_with(completer: StaticCompleter, config: ExtractorConfig) -> ClaimExtractor {
    ClaimExtractor::new(
        Arc::new(completer),
        Arc::new(RateLimiter::new(1000, Duration::from_millis(10))),
        Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            timeout: Duration::from_secs(600),
            half_open_max: 3,
        })),
        config,
    )
}

const TWO_CLAIMS: &str = r#"[
  {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "context": "Vụ Đông Xuân", "confidence": 0.85},
  {"subject": "Lúa ST25", "predicate": "Thời gian sinh trưởng", "object": "95-100 ngày", "context": null, "confidence": 0.8}
]"#;

#[tokio::test]
async fn test_empty_text_yields_no_claims() {
    let extractor = extractor_with(StaticCompleter::always("[]"), fast_config());
    let outcome = extractor.extract_from_text("   ").await.unwrap();
    assert!(outcome.claims.is_empty());
    assert!(!outcome.quota_exhausted);
}

#[tokio::test]
async fn test_short_text_single_call() {
    let completer = StaticCompleter::always(TWO_CLAIMS);
    let extractor = extractor_with(completer, fast_config());

    let outcome = extractor
        .extract_from_text("Lúa ST25 đạt 8.5 tấn/ha trong vụ Đông Xuân.")
        .await
        .unwrap();

    assert_eq!(outcome.claims.len(), 2);
    assert_eq!(outcome.claims[0].subject, "Lúa ST25");
    assert_eq!(outcome.claims[1].object.as_deref(), Some("95-100 ngày"));
}

#[tokio::test]
async fn test_json_recovered_from_chatty_response() {
    let chatty = format!("Đây là kết quả trích xuất:\n{TWO_CLAIMS}\nHy vọng hữu ích!");
    let extractor = extractor_with(StaticCompleter::always(chatty), fast_config());

    let outcome = extractor.extract_from_text("văn bản ngắn").await.unwrap();
    assert_eq!(outcome.claims.len(), 2);
}

#[tokio::test]
async fn test_unparseable_response_yields_no_claims() {
    let extractor = extractor_with(
        StaticCompleter::always("xin lỗi, tôi không tìm thấy thông tin"),
        fast_config(),
    );
    let outcome = extractor.extract_from_text("văn bản ngắn").await.unwrap();
    assert!(outcome.claims.is_empty());
}

#[tokio::test]
async fn test_invalid_items_are_dropped() {
    let mixed = r#"[
      {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "confidence": 0.8},
      {"subject": "", "predicate": "Năng suất", "object": "9 tấn/ha", "confidence": 0.8},
      {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "7 tấn/ha", "confidence": 1.7}
    ]"#;
    let extractor = extractor_with(StaticCompleter::always(mixed), fast_config());

    let outcome = extractor.extract_from_text("văn bản").await.unwrap();
    assert_eq!(outcome.claims.len(), 1);
}

#[tokio::test]
async fn test_dedup_keeps_first_occurrence_by_raw_casing() {
    let duplicated = r#"[
      {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "confidence": 0.9},
      {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "confidence": 0.4},
      {"subject": "LÚA ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "confidence": 0.5}
    ]"#;
    let extractor = extractor_with(StaticCompleter::always(duplicated), fast_config());

    let outcome = extractor.extract_from_text("văn bản").await.unwrap();
    // Dedup keys on raw casing: the upper-cased subject survives as its own claim.
    assert_eq!(outcome.claims.len(), 2);
    assert_eq!(outcome.claims[0].confidence, 0.9);
}

#[tokio::test]
async fn test_rate_limit_retry_then_success() {
    let completer = StaticCompleter::scripted(vec![
        Err(ProviderError::RateLimited {
            message: "429".to_string(),
            retry_after: Some(Duration::from_millis(1)),
        }),
        Ok(TWO_CLAIMS.to_string()),
    ]);
    let extractor = extractor_with(completer, fast_config());

    let outcome = extractor.extract_from_text("văn bản ngắn").await.unwrap();
    assert_eq!(outcome.claims.len(), 2);
}

#[tokio::test]
async fn test_short_text_quota_error_is_surfaced() {
    let completer = StaticCompleter::always_rate_limited(Some(Duration::from_millis(1)));
    let extractor = extractor_with(completer, fast_config());

    let err = extractor.extract_from_text("văn bản ngắn").await.unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_chunked_document_breaker_opens_and_skips_remaining() {
    // Every call 429s; after the breaker threshold the remaining chunks are
    // skipped without further LLM calls.
    let completer = Arc::new(StaticCompleter::always_rate_limited(Some(
        Duration::from_millis(1),
    )));
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 3,
        timeout: Duration::from_secs(600),
        half_open_max: 3,
    }));
    let extractor = ClaimExtractor::new(
        completer.clone(),
        Arc::new(RateLimiter::new(1000, Duration::from_millis(10))),
        breaker.clone(),
        fast_config(),
    );

    let sentence = "Giống lúa ST25 được trồng rộng rãi tại đồng bằng sông Cửu Long từ nhiều năm nay. ";
    let long_text = sentence.repeat(120); // well past the chunk threshold

    let outcome = extractor.extract_from_text(&long_text).await.unwrap();
    assert!(outcome.claims.is_empty());
    assert!(outcome.quota_exhausted);
    assert!(outcome.chunks_skipped > 0);
    // Breaker opened after the threshold: the completer saw a bounded number
    // of calls, not one (plus retry) per chunk.
    assert!(completer.call_count() <= 4);
}

#[tokio::test]
async fn test_extract_from_url_stamps_source() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://nongnghiep.vn/st25".to_string(),
        "Lúa ST25 đạt 8.5 tấn/ha.".to_string(),
    );
    let scraper = StaticScraper::new(pages);
    let extractor = extractor_with(StaticCompleter::always(TWO_CLAIMS), fast_config());

    let outcome = extractor
        .extract_from_url("https://nongnghiep.vn/st25", &scraper)
        .await
        .unwrap();

    assert_eq!(outcome.claims.len(), 2);
    for claim in &outcome.claims {
        assert_eq!(claim.source_url.as_deref(), Some("https://nongnghiep.vn/st25"));
    }
}

#[tokio::test]
async fn test_failed_scrape_yields_empty_success() {
    let scraper = StaticScraper::new(HashMap::new()).with_failure("https://bad.vn");
    let extractor = extractor_with(StaticCompleter::always(TWO_CLAIMS), fast_config());

    let outcome = extractor
        .extract_from_url("https://bad.vn", &scraper)
        .await
        .unwrap();
    assert!(outcome.claims.is_empty());
}
