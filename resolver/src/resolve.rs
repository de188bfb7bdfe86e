//! Group, cluster, score and elect gold claims; flag contradictions.

use crate::numeric::{cluster_numeric, parse_numeric};
use agri_claims::AgriClaim;
use chrono::{Datelike, Utc};
use nli_judge::{cluster_by_semantic_similarity, ContradictionDetail, NliJudge};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use source_trust::TrustTable;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Recency boost for claims whose context mentions the current year.
pub const CURRENT_YEAR_BOOST: f64 = 1.2;
/// Weight for everything older or undated.
pub const OLDER_YEAR_FACTOR: f64 = 1.0;
/// Similarity threshold for semantic clustering of non-numeric values.
pub const SEMANTIC_CLUSTER_THRESHOLD: f64 = 0.85;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").expect("static regex"));

/// A consolidated claim elected from the winning cluster of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedClaim {
    pub gold_claim: AgriClaim,
    /// Distinct source URLs of the winning cluster, first-seen order.
    pub support_urls: Vec<String>,
    /// Weighted vote sum of the winning cluster.
    pub total_score: f64,
    /// All non-null object values present in the winning cluster.
    pub cluster_values: Vec<String>,
    pub has_contradictions: bool,
    pub contradiction_details: Vec<ContradictionDetail>,
}

/// Claim fusion engine. The judge is optional: without one, non-numeric
/// clustering degrades to case-folded equality and contradiction flagging to
/// a distinct-values heuristic.
pub struct Resolver {
    trust: Arc<TrustTable>,
    judge: Option<Arc<NliJudge>>,
}

impl Resolver {
    pub fn new(trust: Arc<TrustTable>, judge: Option<Arc<NliJudge>>) -> Self {
        Self { trust, judge }
    }

    /// Group claims by `(subject, predicate)` key and resolve each group.
    /// Output order follows the first appearance of each group.
    pub async fn resolve(&self, claims: &[AgriClaim]) -> Vec<ResolvedClaim> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut groups: HashMap<(String, String), Vec<AgriClaim>> = HashMap::new();

        for claim in claims {
            let key = claim.group_key();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(claim.clone());
        }

        let mut resolved = Vec::new();
        for key in order {
            if let Some(group) = groups.remove(&key) {
                if let Some(result) = self.resolve_group(&group).await {
                    resolved.push(result);
                }
            }
        }

        debug!(groups = resolved.len(), "claim resolution complete");
        resolved
    }

    /// Weighted voting over one `(subject, predicate)` group.
    pub async fn resolve_group(&self, claims: &[AgriClaim]) -> Option<ResolvedClaim> {
        if claims.is_empty() {
            return None;
        }

        // Partition into numeric and non-numeric members.
        let mut numeric_items: Vec<(AgriClaim, f64)> = Vec::new();
        let mut text_items: Vec<AgriClaim> = Vec::new();
        for claim in claims {
            match claim.object.as_deref().and_then(parse_numeric) {
                Some(value) => numeric_items.push((claim.clone(), value)),
                None => text_items.push(claim.clone()),
            }
        }

        let mut scored_clusters: Vec<(f64, Vec<AgriClaim>)> = Vec::new();

        for cluster in cluster_numeric(numeric_items) {
            let members: Vec<AgriClaim> = cluster.into_iter().map(|(c, _)| c).collect();
            let score = self.score_cluster(&members);
            scored_clusters.push((score, members));
        }

        if !text_items.is_empty() {
            let embedder = self.judge.as_ref().and_then(|j| j.embedder());
            let clusters = cluster_by_semantic_similarity(
                &text_items,
                embedder,
                SEMANTIC_CLUSTER_THRESHOLD,
            )
            .await;
            for members in clusters {
                let score = self.score_cluster(&members);
                scored_clusters.push((score, members));
            }
        }

        if scored_clusters.is_empty() {
            return None;
        }

        // Elect the highest-scoring cluster; ties go to the first encountered.
        let mut best_index = 0;
        for (index, (score, _)) in scored_clusters.iter().enumerate().skip(1) {
            if *score > scored_clusters[best_index].0 {
                best_index = index;
            }
        }
        let (total_score, winners) = scored_clusters.swap_remove(best_index);

        let gold_claim = self.elect_gold(&winners)?;

        let mut support_urls: Vec<String> = Vec::new();
        for claim in &winners {
            if let Some(url) = &claim.source_url {
                if !url.is_empty() && !support_urls.contains(url) {
                    support_urls.push(url.clone());
                }
            }
        }

        let cluster_values: Vec<String> = winners
            .iter()
            .filter_map(|c| c.object.clone())
            .collect();

        let (has_contradictions, contradiction_details) =
            self.flag_contradictions(&winners).await;

        Some(ResolvedClaim {
            gold_claim,
            support_urls,
            total_score,
            cluster_values,
            has_contradictions,
            contradiction_details,
        })
    }

    /// Cluster score: sum of `trust(source) * time_weight` over members.
    fn score_cluster(&self, members: &[AgriClaim]) -> f64 {
        members
            .iter()
            .map(|claim| {
                let trust = self.trust.score(claim.source_url.as_deref().unwrap_or(""));
                trust * time_weight(claim)
            })
            .sum()
    }

    /// Gold claim election: numeric clusters take the member closest to the
    /// cluster mean, text clusters the member maximizing
    /// `confidence + 0.1 * trust`.
    fn elect_gold(&self, winners: &[AgriClaim]) -> Option<AgriClaim> {
        let first = winners.first()?;

        let numeric_pairs: Vec<(&AgriClaim, f64)> = if first
            .object
            .as_deref()
            .and_then(parse_numeric)
            .is_some()
        {
            winners
                .iter()
                .filter_map(|c| c.object.as_deref().and_then(parse_numeric).map(|v| (c, v)))
                .collect()
        } else {
            Vec::new()
        };

        if !numeric_pairs.is_empty() {
            let mean =
                numeric_pairs.iter().map(|(_, v)| v).sum::<f64>() / numeric_pairs.len() as f64;
            let mut best = &numeric_pairs[0];
            for pair in &numeric_pairs[1..] {
                if (pair.1 - mean).abs() < (best.1 - mean).abs() {
                    best = pair;
                }
            }
            return Some(best.0.clone());
        }

        let mut best = first;
        let mut best_score = self.gold_text_score(first);
        for claim in &winners[1..] {
            let score = self.gold_text_score(claim);
            if score > best_score {
                best = claim;
                best_score = score;
            }
        }
        Some(best.clone())
    }

    fn gold_text_score(&self, claim: &AgriClaim) -> f64 {
        let trust = self.trust.score(claim.source_url.as_deref().unwrap_or(""));
        claim.confidence + 0.1 * trust
    }

    /// Pairwise-judge the winning cluster. With no judge wired in, fall back
    /// to flagging when more than one distinct case-folded value is present.
    async fn flag_contradictions(
        &self,
        winners: &[AgriClaim],
    ) -> (bool, Vec<ContradictionDetail>) {
        if winners.len() < 2 {
            return (false, Vec::new());
        }

        if let Some(judge) = &self.judge {
            let result = judge.detect_contradictions_in_group(winners).await;
            return (result.has_contradictions, result.details);
        }

        let mut distinct: Vec<String> = Vec::new();
        for claim in winners {
            let value = claim.object_text().to_lowercase();
            if !value.is_empty() && !distinct.contains(&value) {
                distinct.push(value);
            }
        }

        if distinct.len() > 1 {
            let detail = ContradictionDetail {
                claim1: distinct[0].clone(),
                claim2: distinct[1].clone(),
                reasoning: format!(
                    "Phát hiện {} giá trị khác nhau: {}",
                    distinct.len(),
                    distinct
                        .iter()
                        .take(3)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                confidence: 0.5,
            };
            (true, vec![detail])
        } else {
            (false, Vec::new())
        }
    }
}

/// Time weight: 1.2 when the first plausible year in the context equals the
/// current year, 1.0 otherwise.
pub fn time_weight(claim: &AgriClaim) -> f64 {
    match claim.context.as_deref().and_then(extract_year) {
        Some(year) if year == Utc::now().year() => CURRENT_YEAR_BOOST,
        _ => OLDER_YEAR_FACTOR,
    }
}

/// First 4-digit number in [1900, 2100] found in the context.
fn extract_year(context: &str) -> Option<i32> {
    let m = YEAR_RE.find(context)?;
    let year: i32 = m.as_str().parse().ok()?;
    (1900..=2100).contains(&year).then_some(year)
}
