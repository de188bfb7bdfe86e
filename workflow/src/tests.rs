//! End-to-end workflow tests against scripted providers.

use crate::pipeline::AgriWorkflow;
use crate::search::{SearchConfig, SearchStage};
use crate::state::CancellationFlag;
use agri_providers::{StaticCompleter, StaticScraper, StaticSearch};
use agri_resilience::{BackoffConfig, CircuitBreaker, RateLimiter};
use claim_extraction::{ClaimExtractor, ExtractorConfig};
use claim_resolver::Resolver;
use source_trust::TrustTable;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const CLAIMS_JSON: &str = r#"[
  {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "context": "Vụ Đông Xuân", "confidence": 0.85}
]"#;

fn fast_extractor(completer: StaticCompleter) -> Arc<ClaimExtractor> {
    Arc::new(ClaimExtractor::new(
        Arc::new(completer),
        Arc::new(RateLimiter::new(1000, Duration::from_millis(10))),
        Arc::new(CircuitBreaker::default()),
        ExtractorConfig {
            backoff: BackoffConfig {
                base: Duration::from_millis(5),
                max_jitter: Duration::from_millis(1),
                hint_buffer: Duration::from_millis(1),
            },
            ..ExtractorConfig::default()
        },
    ))
}

fn workflow(
    search: StaticSearch,
    scraper: StaticScraper,
    completer: StaticCompleter,
) -> AgriWorkflow {
    let trust = Arc::new(TrustTable::default());
    AgriWorkflow::new(
        SearchStage::new(Arc::new(search), None, trust.clone(), SearchConfig::default()),
        fast_extractor(completer),
        Arc::new(scraper),
        Arc::new(Resolver::new(trust, None)),
    )
}

#[tokio::test]
async fn test_full_pipeline_produces_summary() {
    let url = "https://nongnghiep.vn/st25".to_string();
    let mut pages = HashMap::new();
    pages.insert(url.clone(), "Lúa ST25 đạt 8.5 tấn/ha.".to_string());

    let wf = workflow(
        StaticSearch::returning(vec![url.clone()]),
        StaticScraper::new(pages),
        StaticCompleter::always(CLAIMS_JSON),
    );

    let state = wf.run("Lúa ST25", None, None).await;

    assert_eq!(state.search_results, vec![url.clone()]);
    assert_eq!(state.claims.len(), 1);
    assert_eq!(state.claims[0].source_url.as_deref(), Some(url.as_str()));
    assert_eq!(state.resolved_claims.len(), 1);
    assert!(state.summary.contains("Kết quả tổng hợp cho: Lúa ST25"));
    assert!(state.summary.contains("8.5 tấn/ha"));
    assert!(state.debug.errors.is_empty());
}

#[tokio::test]
async fn test_all_sources_failing_yields_stock_summary() {
    let url_a = "https://site-a.example/1".to_string();
    let url_b = "https://site-b.example/2".to_string();
    let scraper = StaticScraper::new(HashMap::new())
        .with_failure(&url_a)
        .with_failure(&url_b);

    let wf = workflow(
        StaticSearch::returning(vec![url_a, url_b]),
        scraper,
        StaticCompleter::always(CLAIMS_JSON),
    );

    let state = wf.run("Lúa ST25", None, None).await;

    assert!(state.claims.is_empty());
    assert!(state.resolved_claims.is_empty());
    assert!(state.summary.contains("Chưa tìm được thông tin tin cậy"));
}

#[tokio::test]
async fn test_per_url_failures_do_not_abort_pipeline() {
    let good = "https://nongnghiep.vn/good".to_string();
    let bad = "https://site-bad.example/x".to_string();
    let mut pages = HashMap::new();
    pages.insert(good.clone(), "Lúa ST25 đạt 8.5 tấn/ha.".to_string());
    let scraper = StaticScraper::new(pages).with_failure(&bad);

    let wf = workflow(
        StaticSearch::returning(vec![bad, good]),
        scraper,
        StaticCompleter::always(CLAIMS_JSON),
    );

    let state = wf.run("Lúa ST25", None, None).await;
    // The failed scrape yields no claims but the good URL still resolves.
    assert_eq!(state.claims.len(), 1);
    assert_eq!(state.resolved_claims.len(), 1);
}

#[tokio::test]
async fn test_explicit_query_is_used_verbatim() {
    let wf = workflow(
        StaticSearch::returning(vec![]),
        StaticScraper::new(HashMap::new()),
        StaticCompleter::always("[]"),
    );

    let state = wf.run("Lúa ST25", Some("ST25 giải thưởng gạo ngon"), None).await;
    assert_eq!(state.query, "ST25 giải thưởng gạo ngon");
    assert_eq!(state.debug.search_query, "ST25 giải thưởng gạo ngon");
}

#[tokio::test]
async fn test_cancellation_skips_pending_urls() {
    let urls: Vec<String> = (0..6)
        .map(|i| format!("https://site-{i}.example/page"))
        .collect();
    let mut pages = HashMap::new();
    for url in &urls {
        pages.insert(url.clone(), "Lúa ST25 đạt 8.5 tấn/ha.".to_string());
    }

    let wf = workflow(
        StaticSearch::returning(urls),
        StaticScraper::new(pages),
        StaticCompleter::always(CLAIMS_JSON),
    );

    let cancel = CancellationFlag::new();
    cancel.cancel();

    let state = wf.run("Lúa ST25", None, Some(&cancel)).await;
    assert!(state.debug.cancelled);
    assert!(state.claims.is_empty());
    // Partial results still produce a well-formed (stock) summary.
    assert!(state.summary.contains("Chưa tìm được thông tin tin cậy"));
}
