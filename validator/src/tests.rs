//! Validator scenario tests: consistent article, self-contradicting article,
//! quota surfacing, repeatability, web cross-checking.

use crate::validator::{validation_score, ArticleValidator};
use agri_providers::{
    EmbeddingProvider, MappedEmbedder, StaticCompleter, StaticScraper, StaticSearch,
};
use agri_resilience::{BackoffConfig, CircuitBreaker, RateLimiter};
use agri_workflow::{AgriWorkflow, SearchConfig, SearchStage};
use claim_extraction::{ClaimExtractor, ExtractorConfig};
use claim_resolver::Resolver;
use nli_judge::{ClaimRelation, JudgeCache, NliJudge};
use source_trust::TrustTable;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const CONSISTENT_ARTICLE: &str = "# Lúa ST25\n\n\
    Giống lúa ST25 do kỹ sư Hồ Quang Cua lai tạo, được canh tác rộng rãi tại đồng bằng sông Cửu Long. \
    Năng suất trung bình đạt 8.5 tấn/ha trong vụ Đông Xuân. Thời gian sinh trưởng từ 95 đến 100 ngày. \
    Gạo có mùi thơm lá dứa đặc trưng và vị ngọt nhẹ.";

const CONSISTENT_CLAIMS: &str = r#"[
  {"subject": "Lúa ST25", "predicate": "Năng suất", "object": "8.5 tấn/ha", "context": "Vụ Đông Xuân", "confidence": 0.85},
  {"subject": "Lúa ST25", "predicate": "Thời gian sinh trưởng", "object": "95-100 ngày", "confidence": 0.8},
  {"subject": "Lúa ST25", "predicate": "Mùi vị", "object": "thơm lá dứa", "confidence": 0.9}
]"#;

const CONTRADICTING_ARTICLE: &str = "# Gạo ST25\n\n\
    Gạo ST25 từng đạt giải nhất cuộc thi gạo ngon thế giới theo một số nguồn tin trong nước. \
    Tuy nhiên một đoạn khác của bài viết lại ghi rằng gạo ST25 chỉ đạt giải khuyến khích cuộc thi gạo ngon thế giới. \
    Bài viết cần được rà soát lại thông tin giải thưởng.";

const CONTRADICTING_CLAIMS: &str = r#"[
  {"subject": "Gạo ST25", "predicate": "Giải thưởng", "object": "Giải nhất cuộc thi gạo ngon thế giới", "confidence": 0.9},
  {"subject": "Gạo ST25", "predicate": "Giải thưởng", "object": "Giải khuyến khích cuộc thi gạo ngon thế giới", "confidence": 0.7}
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

fn judge_with(
    completer: StaticCompleter,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    cache_dir: &std::path::Path,
) -> Arc<NliJudge> {
    Arc::new(NliJudge::new(
        Arc::new(completer),
        embedder,
        JudgeCache::new(cache_dir),
        Arc::new(RateLimiter::new(1000, Duration::from_millis(10))),
        Arc::new(CircuitBreaker::default()),
    ))
}

/// Embedder whose vectors put the two award statements in one semantic
/// cluster while leaving their raw objects unmapped (so the judge falls
/// through to the LLM).
fn award_cluster_embedder() -> Arc<dyn EmbeddingProvider> {
    let mut embedder = MappedEmbedder::default();
    embedder.insert(
        "Gạo ST25 - Giải thưởng: Giải nhất cuộc thi gạo ngon thế giới",
        vec![1.0, 0.0],
    );
    embedder.insert(
        "Gạo ST25 - Giải thưởng: Giải khuyến khích cuộc thi gạo ngon thế giới",
        vec![0.9, 0.2],
    );
    Arc::new(embedder)
}

/// S5 — a consistent article validates cleanly.
#[tokio::test]
async fn test_consistent_article() {
    let trust = Arc::new(TrustTable::default());
    let validator = ArticleValidator::new(
        fast_extractor(StaticCompleter::always(CONSISTENT_CLAIMS)),
        Arc::new(Resolver::new(trust, None)),
        None,
        None,
    );

    let report = validator.validate_markdown(CONSISTENT_ARTICLE, false).await;

    assert!(report.success);
    assert_eq!(report.article_title, "Lúa ST25");
    assert_eq!(report.article_claims.len(), 3);
    assert_eq!(report.resolved_claims.len(), 3);
    assert!(report.validation_score >= 0.6, "score {}", report.validation_score);
    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    assert!(!report.web_validation.enabled);
}

/// S6 — a self-contradicting article flags the award contradiction with both
/// object strings in the warning.
#[tokio::test]
async fn test_self_contradicting_article() {
    let dir = tempfile::tempdir().unwrap();
    let judge = judge_with(
        StaticCompleter::always(
            r#"{"relation": "CONTRADICTED", "confidence": 0.9, "reasoning": "cùng cuộc thi, khác giải"}"#,
        ),
        Some(award_cluster_embedder()),
        dir.path(),
    );
    let trust = Arc::new(TrustTable::default());
    let validator = ArticleValidator::new(
        fast_extractor(StaticCompleter::always(CONTRADICTING_CLAIMS)),
        Arc::new(Resolver::new(trust, Some(judge))),
        None,
        None,
    );

    let report = validator
        .validate_markdown(CONTRADICTING_ARTICLE, false)
        .await;

    assert!(report.success);
    assert!(!report.resolved_claims.is_empty());
    assert!(report.resolved_claims.iter().any(|r| r.has_contradictions));
    assert!(report.warnings.iter().any(|w| {
        w.contains("Mâu thuẫn phát hiện")
            && w.contains("Giải nhất cuộc thi gạo ngon thế giới")
            && w.contains("Giải khuyến khích cuộc thi gạo ngon thế giới")
    }));
}

#[tokio::test]
async fn test_quota_exhaustion_aborts_with_operator_message() {
    let trust = Arc::new(TrustTable::default());
    let validator = ArticleValidator::new(
        fast_extractor(StaticCompleter::always_rate_limited(Some(
            Duration::from_secs(30),
        ))),
        Arc::new(Resolver::new(trust, None)),
        None,
        None,
    );

    let report = validator.validate_markdown(CONSISTENT_ARTICLE, false).await;

    assert!(!report.success);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Quota API đã hết"));
    assert!(report.errors[0].contains("giây"));
    assert!(report.resolved_claims.is_empty());
}

#[tokio::test]
async fn test_repeated_validation_with_warm_cache_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let trust = Arc::new(TrustTable::default());

    let make_validator = || {
        let judge = judge_with(
            StaticCompleter::always(
                r#"{"relation": "CONTRADICTED", "confidence": 0.9, "reasoning": "khác giải"}"#,
            ),
            Some(award_cluster_embedder()),
            dir.path(),
        );
        ArticleValidator::new(
            fast_extractor(StaticCompleter::always(CONTRADICTING_CLAIMS)),
            Arc::new(Resolver::new(trust.clone(), Some(judge))),
            None,
            None,
        )
    };

    let first = make_validator()
        .validate_markdown(CONTRADICTING_ARTICLE, false)
        .await;
    let second = make_validator()
        .validate_markdown(CONTRADICTING_ARTICLE, false)
        .await;

    assert_eq!(first.resolved_claims.len(), second.resolved_claims.len());
    for (a, b) in first.resolved_claims.iter().zip(second.resolved_claims.iter()) {
        assert_eq!(a.gold_claim, b.gold_claim);
        assert_eq!(a.has_contradictions, b.has_contradictions);
        assert_eq!(a.cluster_values, b.cluster_values);
    }
    assert!((first.validation_score - second.validation_score).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_article_succeeds_with_warning() {
    let trust = Arc::new(TrustTable::default());
    let validator = ArticleValidator::new(
        fast_extractor(StaticCompleter::always("[]")),
        Arc::new(Resolver::new(trust, None)),
        None,
        None,
    );

    let report = validator.validate_markdown("# Tiêu đề\n\nNgắn.", false).await;

    assert!(report.success);
    assert!(report.article_claims.is_empty());
    assert_eq!(report.validation_score, 0.0);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("Không trích xuất được claim nào")));
}

#[tokio::test]
async fn test_web_validation_cross_judges_important_predicates() {
    let dir = tempfile::tempdir().unwrap();
    let trust = Arc::new(TrustTable::default());

    // The workflow finds one press article asserting a different prize.
    let web_url = "https://nongnghiep.vn/giai-thuong-st25".to_string();
    let mut pages = HashMap::new();
    pages.insert(web_url.clone(), "Gạo ST25 đạt giải nhì cuộc thi gạo.".to_string());
    let workflow = Arc::new(AgriWorkflow::new(
        SearchStage::new(
            Arc::new(StaticSearch::returning(vec![web_url])),
            None,
            trust.clone(),
            SearchConfig::default(),
        ),
        fast_extractor(StaticCompleter::always(
            r#"[{"subject": "Gạo ST25", "predicate": "Giải thưởng", "object": "Giải nhì cuộc thi gạo ngon thế giới", "confidence": 0.8}]"#,
        )),
        Arc::new(StaticScraper::new(pages)),
        Arc::new(Resolver::new(trust.clone(), None)),
    ));

    // Map the two prize statements to dissimilar vectors so the similarity
    // shortcut does not fire and the pair reaches the LLM judge.
    let mut object_embedder = MappedEmbedder::default();
    object_embedder.insert("Giải nhất cuộc thi gạo ngon thế giới", vec![1.0, 0.0]);
    object_embedder.insert("Giải nhì cuộc thi gạo ngon thế giới", vec![0.0, 1.0]);

    let judge = judge_with(
        StaticCompleter::always(
            r#"{"relation": "CONTRADICTED", "confidence": 0.88, "reasoning": "giải nhất khác giải nhì"}"#,
        ),
        Some(Arc::new(object_embedder)),
        dir.path(),
    );

    let validator = ArticleValidator::new(
        fast_extractor(StaticCompleter::always(
            r#"[{"subject": "Gạo ST25", "predicate": "Giải thưởng", "object": "Giải nhất cuộc thi gạo ngon thế giới", "confidence": 0.9}]"#,
        )),
        Arc::new(Resolver::new(trust, None)),
        Some(judge),
        Some(workflow),
    );

    let report = validator
        .validate_markdown(CONTRADICTING_ARTICLE, true)
        .await;

    assert!(report.success);
    assert!(report.web_validation.enabled);
    assert_eq!(report.web_validation.web_claims_count, 1);
    assert_eq!(report.web_validation.validation_results.len(), 1);
    assert_eq!(
        report.web_validation.validation_results[0].relation,
        ClaimRelation::Contradicted
    );
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("khác với nguồn web")));
}

#[test]
fn test_validation_score_blend() {
    assert_eq!(validation_score(&[]), 0.0);
}
