//! Article validation: extract claims from a finished article, optionally
//! cross-check them against fresh web evidence, then resolve the union.

use crate::markdown::{extract_title, markdown_to_text};
use agri_claims::AgriClaim;
use agri_providers::ProviderError;
use agri_workflow::AgriWorkflow;
use chrono::{DateTime, Utc};
use claim_extraction::ClaimExtractor;
use claim_resolver::{ResolvedClaim, Resolver};
use nli_judge::{ClaimRelation, NliJudge};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Predicates worth cross-checking against the web: authorship, origin,
/// awards, achievements, titles.
pub const IMPORTANT_PREDICATES: &[&str] = &[
    "tác giả",
    "nguồn gốc",
    "giải thưởng",
    "thành tích",
    "danh hiệu",
];

/// One article-claim vs web-claim judgment.
#[derive(Debug, Clone, Serialize)]
pub struct WebValidationRecord {
    pub article_claim: AgriClaim,
    pub web_claim: AgriClaim,
    pub relation: ClaimRelation,
    pub confidence: f64,
    pub reasoning: String,
}

/// Web cross-check results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebValidation {
    pub enabled: bool,
    pub web_claims_count: usize,
    pub validation_results: Vec<WebValidationRecord>,
}

/// Full validation report for one article.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    pub article_title: String,
    pub article_claims: Vec<AgriClaim>,
    pub resolved_claims: Vec<ResolvedClaim>,
    pub validation_score: f64,
    pub web_validation: WebValidation,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationReport {
    fn empty() -> Self {
        Self {
            success: false,
            article_title: String::new(),
            article_claims: Vec::new(),
            resolved_claims: Vec::new(),
            validation_score: 0.0,
            web_validation: WebValidation::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Validates a wiki article by treating it as one more source.
pub struct ArticleValidator {
    extractor: Arc<ClaimExtractor>,
    resolver: Arc<Resolver>,
    judge: Option<Arc<NliJudge>>,
    workflow: Option<Arc<AgriWorkflow>>,
}

impl ArticleValidator {
    pub fn new(
        extractor: Arc<ClaimExtractor>,
        resolver: Arc<Resolver>,
        judge: Option<Arc<NliJudge>>,
        workflow: Option<Arc<AgriWorkflow>>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            judge,
            workflow,
        }
    }

    /// Validate an article file on disk.
    pub async fn validate_file(&self, path: &Path, use_web_validation: bool) -> ValidationReport {
        let markdown = match std::fs::read_to_string(path) {
            Ok(markdown) => markdown,
            Err(e) => {
                let mut report = ValidationReport::empty();
                report.errors.push(format!("Lỗi đọc file: {e}"));
                return report;
            }
        };
        self.validate_markdown(&markdown, use_web_validation).await
    }

    /// Validate article markdown. Never panics and never returns a partial
    /// failure: either `success` with accumulated warnings, or `success =
    /// false` with a single operator-readable error line.
    pub async fn validate_markdown(
        &self,
        markdown: &str,
        use_web_validation: bool,
    ) -> ValidationReport {
        let mut report = ValidationReport::empty();
        report.article_title = extract_title(markdown).unwrap_or_default();

        let text = markdown_to_text(markdown);
        if text.chars().count() < 100 {
            report.warnings.push(
                "Nội dung bài viết quá ngắn, có thể không đủ thông tin để validate".to_string(),
            );
        }

        // Step 1: extract claims from the article body.
        let outcome = match self.extractor.extract_from_text(&text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report.errors.push(describe_extraction_error(&e));
                return report;
            }
        };
        if outcome.quota_exhausted {
            report
                .warnings
                .push("Một số đoạn bị bỏ qua do hết quota API".to_string());
        }
        report.article_claims = outcome.claims.clone();

        if report.article_claims.is_empty() {
            report
                .warnings
                .push("Không trích xuất được claim nào từ bài viết".to_string());
            report.success = true;
            return report;
        }

        // Step 2: optional web cross-check over important predicates.
        let mut web_claims: Vec<AgriClaim> = Vec::new();
        if use_web_validation {
            if let Some(workflow) = &self.workflow {
                let main_subject = dominant_subject(&report.article_claims)
                    .unwrap_or_else(|| report.article_title.clone());

                if !main_subject.trim().is_empty() {
                    info!(subject = %main_subject, "running web validation workflow");
                    let state = workflow.run(&main_subject, None, None).await;
                    web_claims = state.claims;
                    report.web_validation.enabled = true;
                    report.web_validation.web_claims_count = web_claims.len();

                    let article_claims = report.article_claims.clone();
                    self.cross_judge(&article_claims, &web_claims, &mut report)
                        .await;
                }
            } else {
                report
                    .warnings
                    .push("Không thể tìm kiếm web để validate: workflow chưa được cấu hình".to_string());
            }
        }

        // Step 3: resolve the union of article and web claims.
        let mut all_claims = report.article_claims.clone();
        all_claims.extend(web_claims);
        report.resolved_claims = self.resolver.resolve(&all_claims).await;

        // Step 4: contradiction warnings on resolved groups.
        let contradicted: Vec<&ResolvedClaim> = report
            .resolved_claims
            .iter()
            .filter(|r| r.has_contradictions)
            .collect();
        if !contradicted.is_empty() {
            report.warnings.push(format!(
                "Phát hiện {} claim có mâu thuẫn. Vui lòng kiểm tra lại nguồn thông tin.",
                contradicted.len()
            ));
            for resolved in &contradicted {
                for detail in resolved.contradiction_details.iter().take(2) {
                    report.warnings.push(format!(
                        "Mâu thuẫn phát hiện: '{}' vs '{}' ({})",
                        detail.claim1, detail.claim2, detail.reasoning
                    ));
                }
            }
        }

        // Step 5: validation score. Deliberately blends the un-normalized
        // cluster score, so claims with many sources dominate.
        report.validation_score = validation_score(&report.resolved_claims);

        // Step 6: heuristic warnings over the raw article claims.
        let low_confidence = report
            .article_claims
            .iter()
            .filter(|c| c.confidence < 0.5)
            .count();
        if low_confidence > 0 {
            report.warnings.push(format!(
                "Có {low_confidence} claim có độ tin cậy thấp (<0.5). Nên kiểm tra lại nguồn thông tin."
            ));
        }

        let without_object = report
            .article_claims
            .iter()
            .filter(|c| c.object_text().is_empty())
            .count();
        if without_object * 2 > report.article_claims.len() {
            report.warnings.push(
                "Hơn 50% claims không có số liệu cụ thể. Bài viết có thể thiếu thông tin định lượng quan trọng."
                    .to_string(),
            );
        }

        report.success = true;
        report
    }

    /// Judge important article claims against web claims sharing their
    /// grouping key, recording every judgment.
    async fn cross_judge(
        &self,
        article_claims: &[AgriClaim],
        web_claims: &[AgriClaim],
        report: &mut ValidationReport,
    ) {
        let Some(judge) = &self.judge else {
            return;
        };

        for article_claim in article_claims {
            let predicate = article_claim.predicate.trim().to_lowercase();
            if !IMPORTANT_PREDICATES.iter().any(|p| predicate.contains(p)) {
                continue;
            }

            let key = article_claim.group_key();
            for web_claim in web_claims.iter().filter(|w| w.group_key() == key) {
                let judgment = judge.judge_pair(article_claim, web_claim).await;

                if judgment.relation == ClaimRelation::Contradicted {
                    warn!(
                        subject = %article_claim.subject,
                        predicate = %article_claim.predicate,
                        "web validation found a contradiction"
                    );
                    report.warnings.push(format!(
                        "Mâu thuẫn phát hiện: '{}' khác với nguồn web '{}' (Nguồn: {})",
                        article_claim.summary(),
                        web_claim.object.as_deref().unwrap_or(""),
                        web_claim.source_url.as_deref().unwrap_or("N/A")
                    ));
                }

                report.web_validation.validation_results.push(WebValidationRecord {
                    article_claim: article_claim.clone(),
                    web_claim: web_claim.clone(),
                    relation: judgment.relation,
                    confidence: judgment.confidence,
                    reasoning: judgment.reasoning,
                });
            }
        }
    }
}

/// Most frequent subject among the claims, ties broken by first occurrence.
fn dominant_subject(claims: &[AgriClaim]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for claim in claims {
        let subject = claim.subject.as_str();
        if !counts.contains_key(subject) {
            order.push(subject);
        }
        *counts.entry(subject).or_insert(0) += 1;
    }

    let mut best: Option<&str> = None;
    for subject in order {
        let better = match best {
            None => true,
            Some(current) => counts[subject] > counts[current],
        };
        if better {
            best = Some(subject);
        }
    }
    best.map(str::to_string)
}

/// `0.6 * mean(gold confidence) + 0.4 * mean(total score)`; 0.0 with no
/// resolved claims.
pub(crate) fn validation_score(resolved: &[ResolvedClaim]) -> f64 {
    if resolved.is_empty() {
        return 0.0;
    }
    let n = resolved.len() as f64;
    let avg_confidence = resolved.iter().map(|r| r.gold_claim.confidence).sum::<f64>() / n;
    let avg_score = resolved.iter().map(|r| r.total_score).sum::<f64>() / n;
    avg_confidence * 0.6 + avg_score * 0.4
}

/// Operator-readable message for extraction failures; quota errors spell out
/// the remedy.
fn describe_extraction_error(error: &ProviderError) -> String {
    if error.is_quota() {
        let retry_hint = error
            .retry_after()
            .map(|d| format!("thử lại sau {} giây", d.as_secs()))
            .unwrap_or_else(|| "thử lại sau vài phút".to_string());
        format!(
            "Quota API đã hết. Lỗi: {error}. Giải pháp: {retry_hint} hoặc nâng cấp lên Paid tier."
        )
    } else {
        format!("Lỗi khi extract claims: {error}")
    }
}
