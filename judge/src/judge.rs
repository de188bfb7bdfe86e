//! Pairwise judge: shortcut rules, embedding similarity, then the LLM.

use crate::cache::JudgeCache;
use crate::types::{ClaimRelation, ContradictionDetail, GroupContradictions, Judgment};
use agri_claims::AgriClaim;
use agri_providers::{EmbeddingProvider, LlmCompleter};
use agri_resilience::{CircuitBreaker, RateLimiter};
use std::sync::Arc;
use tracing::{debug, warn};

/// System prompt for the Vietnamese agricultural NLI judge.
pub const NLI_JUDGE_SYSTEM_PROMPT: &str = r#"Bạn là Thẩm phán Logic (NLI Judge) chuyên về dữ liệu nông nghiệp Việt Nam.
Nhiệm vụ: So sánh hai mệnh đề để phát hiện mâu thuẫn logic.

Quy tắc:
- SUPPORTED: Hai mệnh đề có ý nghĩa tương đương hoặc bổ sung cho nhau
- CONTRADICTED: Hai mệnh đề mâu thuẫn nhau về cùng một sự kiện/thuộc tính
- NEUTRAL: Hai mệnh đề không liên quan hoặc về chủ đề khác nhau

Ví dụ:
- "Giải nhất" vs "Giải khuyến khích" → CONTRADICTED (cùng cuộc thi, khác giải)
- "8.5 tấn/ha" vs "8.6 tấn/ha" → SUPPORTED (số liệu xấp xỉ)
- "Lúa ST25" vs "Lúa ST24" → NEUTRAL (khác giống lúa)

Trả về JSON với format:
{
  "relation": "SUPPORTED" | "CONTRADICTED" | "NEUTRAL",
  "confidence": 0.0-1.0,
  "reasoning": "Giải thích ngắn gọn"
}"#;

/// Keyword pairs that signal a contradiction when JSON parsing fails.
const CONTRADICTION_KEYWORDS: &[(&str, &str)] = &[
    ("giải nhất", "giải khuyến khích"),
    ("giải nhất", "giải nhì"),
    ("giải nhất", "giải ba"),
    ("có", "không có"),
    ("đúng", "sai"),
];

const EMBEDDING_SUPPORT_THRESHOLD: f64 = 0.95;
const STRING_SUPPORT_THRESHOLD: f64 = 0.9;

/// Pairwise claim judge.
///
/// The LLM call sits behind the shared rate limiter and circuit breaker; a
/// refused call skips straight to the lexical fallback so one unavailable
/// provider cannot stall a batch.
pub struct NliJudge {
    completer: Arc<dyn LlmCompleter>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    cache: JudgeCache,
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
}

impl NliJudge {
    pub fn new(
        completer: Arc<dyn LlmCompleter>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        cache: JudgeCache,
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            completer,
            embedder,
            cache,
            limiter,
            breaker,
        }
    }

    pub fn embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embedder.as_ref()
    }

    /// Judge one ordered pair of claims. Never fails: provider problems
    /// degrade to low-confidence NEUTRAL.
    pub async fn judge_pair(&self, a: &AgriClaim, b: &AgriClaim) -> Judgment {
        let key = JudgeCache::key(a, b);
        if let Some(mut cached) = self.cache.get(&key) {
            cached.from_cache = true;
            return cached;
        }

        // Different subject or predicate: trivially unrelated, not cached.
        if a.group_key() != b.group_key() {
            return Judgment::new(
                ClaimRelation::Neutral,
                1.0,
                "Khác subject hoặc predicate",
            );
        }

        let obj_a = a.object_text().to_string();
        let obj_b = b.object_text().to_string();

        // Identical objects after case folding.
        if !obj_a.is_empty() && !obj_b.is_empty() && obj_a.to_lowercase() == obj_b.to_lowercase() {
            let judgment = Judgment::new(
                ClaimRelation::Supported,
                1.0,
                "Giá trị giống nhau hoàn toàn",
            );
            self.cache.put(&key, &judgment);
            return judgment;
        }

        if !obj_a.is_empty() && !obj_b.is_empty() {
            match self.embedding_similarity(&obj_a, &obj_b).await {
                Some(similarity) => {
                    if similarity > EMBEDDING_SUPPORT_THRESHOLD {
                        let judgment = Judgment::new(
                            ClaimRelation::Supported,
                            similarity,
                            format!("Giá trị tương đồng cao (similarity: {similarity:.2})"),
                        );
                        self.cache.put(&key, &judgment);
                        return judgment;
                    }
                }
                None => {
                    let ratio = strsim::normalized_levenshtein(
                        &obj_a.to_lowercase(),
                        &obj_b.to_lowercase(),
                    );
                    if ratio > STRING_SUPPORT_THRESHOLD {
                        let judgment = Judgment::new(
                            ClaimRelation::Supported,
                            ratio,
                            format!("Giá trị tương đồng (similarity: {ratio:.2})"),
                        );
                        self.cache.put(&key, &judgment);
                        return judgment;
                    }
                }
            }
        }

        let judgment = self.llm_judge(a, b, &obj_a, &obj_b).await;
        self.cache.put(&key, &judgment);
        judgment
    }

    /// Judge every pair of the group (i < j), collecting contradictions.
    pub async fn detect_contradictions_in_group(
        &self,
        claims: &[AgriClaim],
    ) -> GroupContradictions {
        let mut result = GroupContradictions::default();
        if claims.len() < 2 {
            return result;
        }

        for i in 0..claims.len() {
            for j in (i + 1)..claims.len() {
                let judgment = self.judge_pair(&claims[i], &claims[j]).await;
                result.relations.push((i, j, judgment.relation));

                if judgment.relation == ClaimRelation::Contradicted {
                    result.has_contradictions = true;
                    result.details.push(ContradictionDetail {
                        claim1: claim_line(&claims[i]),
                        claim2: claim_line(&claims[j]),
                        reasoning: judgment.reasoning.clone(),
                        confidence: judgment.confidence,
                    });
                }
            }
        }

        result
    }

    async fn embedding_similarity(&self, obj_a: &str, obj_b: &str) -> Option<f64> {
        let embedder = self.embedder.as_ref()?;
        let vec_a = embedder.embed(obj_a).await.ok()?;
        let vec_b = embedder.embed(obj_b).await.ok()?;
        embedding_cosine(&vec_a, &vec_b)
    }

    async fn llm_judge(&self, a: &AgriClaim, b: &AgriClaim, obj_a: &str, obj_b: &str) -> Judgment {
        if !self.breaker.can_make_request() {
            warn!("circuit breaker open, skipping LLM judge call");
            return lexical_fallback(obj_a, obj_b, "Bỏ qua LLM do circuit breaker mở");
        }

        self.limiter.wait().await;
        self.breaker.record_request();

        let user_prompt = format!(
            "Mệnh đề 1: {}\nMệnh đề 2: {}\n\nHãy phân tích và trả về JSON theo format đã quy định.",
            a.summary(),
            b.summary()
        );

        match self.completer.complete(NLI_JUDGE_SYSTEM_PROMPT, &user_prompt).await {
            Ok(content) => {
                self.breaker.record_success();
                match parse_judgment(&content) {
                    Some(judgment) => judgment,
                    None => {
                        debug!("LLM judge returned unparseable output, using lexical fallback");
                        lexical_fallback(obj_a, obj_b, "Không thể parse kết quả từ LLM")
                    }
                }
            }
            Err(e) => {
                self.breaker.record_failure(e.is_rate_limited());
                lexical_fallback(obj_a, obj_b, &format!("Lỗi khi gọi LLM: {e}"))
            }
        }
    }
}

/// Format for contradiction details: subject - predicate: object.
fn claim_line(claim: &AgriClaim) -> String {
    format!(
        "{} - {}: {}",
        claim.subject,
        claim.predicate,
        claim.object.as_deref().unwrap_or("")
    )
}

/// Extract the first JSON object of the response and decode it.
fn parse_judgment(content: &str) -> Option<Judgment> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&content[start..=end]).ok()?;

    let relation = match value["relation"].as_str()? {
        "SUPPORTED" => ClaimRelation::Supported,
        "CONTRADICTED" => ClaimRelation::Contradicted,
        "NEUTRAL" => ClaimRelation::Neutral,
        _ => return None,
    };
    let confidence = value["confidence"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0);
    let reasoning = value["reasoning"].as_str().unwrap_or("").to_string();

    Some(Judgment::new(relation, confidence, reasoning))
}

/// Cosine of the angle between two embedding vectors, accumulated in f64 in
/// a single pass. `None` when the vectors are unusable for comparison
/// (dimension mismatch or zero magnitude), which the ladder treats the same
/// as an unavailable embedder.
fn embedding_cosine(lhs: &[f32], rhs: &[f32]) -> Option<f64> {
    if lhs.len() != rhs.len() || lhs.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut lhs_sq = 0.0f64;
    let mut rhs_sq = 0.0f64;
    for (x, y) in lhs.iter().zip(rhs) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        lhs_sq += x * x;
        rhs_sq += y * y;
    }

    let magnitude = (lhs_sq * rhs_sq).sqrt();
    if magnitude == 0.0 {
        return None;
    }
    Some(dot / magnitude)
}

/// Last-resort lexical contradiction check over the two object strings.
fn lexical_fallback(obj_a: &str, obj_b: &str, reason: &str) -> Judgment {
    let a = obj_a.to_lowercase();
    let b = obj_b.to_lowercase();

    if !a.is_empty() && !b.is_empty() {
        for (kw1, kw2) in CONTRADICTION_KEYWORDS {
            if (a.contains(kw1) && b.contains(kw2)) || (b.contains(kw1) && a.contains(kw2)) {
                return Judgment::new(
                    ClaimRelation::Contradicted,
                    0.7,
                    format!("Phát hiện từ khóa mâu thuẫn: {kw1} vs {kw2}"),
                );
            }
        }
    }

    Judgment::new(ClaimRelation::Neutral, 0.3, reason)
}

/// Cluster claims by semantic similarity of their full
/// `subject - predicate: object` strings. With no embedder the fallback is
/// case-folded exact-match equivalence.
pub async fn cluster_by_semantic_similarity(
    claims: &[AgriClaim],
    embedder: Option<&Arc<dyn EmbeddingProvider>>,
    threshold: f64,
) -> Vec<Vec<AgriClaim>> {
    let mut clusters: Vec<Vec<AgriClaim>> = Vec::new();

    'next_claim: for claim in claims {
        let claim_value = cluster_value(claim);

        for cluster in clusters.iter_mut() {
            let cluster_value_str = cluster_value(&cluster[0]);

            if claim_value.to_lowercase() == cluster_value_str.to_lowercase() {
                cluster.push(claim.clone());
                continue 'next_claim;
            }

            if let Some(embedder) = embedder {
                let similarity = async {
                    let a = embedder.embed(&claim_value).await.ok()?;
                    let b = embedder.embed(&cluster_value_str).await.ok()?;
                    embedding_cosine(&a, &b)
                }
                .await;

                if let Some(similarity) = similarity {
                    if similarity >= threshold {
                        cluster.push(claim.clone());
                        continue 'next_claim;
                    }
                }
            }
        }

        clusters.push(vec![claim.clone()]);
    }

    clusters
}

fn cluster_value(claim: &AgriClaim) -> String {
    format!(
        "{} - {}: {}",
        claim.subject,
        claim.predicate,
        claim.object.as_deref().unwrap_or("")
    )
}
