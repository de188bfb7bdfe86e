//! LLM claim extractor.
//!
//! Feeds text (chunked when long) to the LLM with a fixed Vietnamese
//! extraction prompt and parses the returned JSON array into validated
//! claims. All LLM traffic goes through the shared rate limiter and circuit
//! breaker; 429s get one backoff retry per chunk, honoring server hints.

use crate::chunk::chunk_text;
use agri_claims::AgriClaim;
use agri_providers::{LlmCompleter, PageScraper, ProviderError};
use agri_resilience::{retry_delay, BackoffConfig, CircuitBreaker, RateLimiter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// System prompt for the Vietnamese agricultural claim extractor.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Bạn là Chuyên gia Dữ liệu Nông nghiệp Việt Nam chuyên trích xuất thông tin chi tiết.
Nhiệm vụ: Trích xuất TẤT CẢ các khẳng định (Claims) có thể từ văn bản về giống cây trồng/kỹ thuật canh tác.

QUAN TRỌNG: Bạn phải trích xuất CÀNG NHIỀU claims CÀNG TỐT để đảm bảo double-check thông tin.
Hãy trích xuất từ MỌI đoạn văn, MỌI câu có chứa thông tin về:
- Số liệu cụ thể (năng suất, thời gian, kích thước, trọng lượng, tỷ lệ...)
- Đặc điểm hình thái (màu sắc, hình dạng, kích thước...)
- Giải thưởng, thành tích, danh hiệu
- Điều kiện canh tác (vụ mùa, vùng địa lý, khí hậu...)
- Khả năng chịu đựng (mặn, hạn, lũ, sâu bệnh...)
- Chất lượng sản phẩm (mùi vị, độ dẻo, hàm lượng dinh dưỡng...)
- Kỹ thuật canh tác (mật độ, phân bón, tưới tiêu...)
- Thông tin lịch sử, nguồn gốc, tác giả
- So sánh với giống khác

Yêu cầu Output: trả về một JSON array các object theo schema AgriClaim:
{
  "subject": "Tên thực thể chính hóa (VD: Lúa ST25, Bệnh đạo ôn)",
  "predicate": "Thuộc tính (VD: Năng suất, Thời gian sinh trưởng, Khả năng chịu mặn, Giải thưởng...)",
  "object": "Giá trị cụ thể bao gồm đơn vị (VD: 8.5 tấn/ha, 95-100 ngày, Giải nhất cuộc thi...) hoặc mô tả chi tiết nếu không có số liệu",
  "context": "Điều kiện áp dụng (VD: Vụ Đông Xuân, Vùng ven biển, Năm 2019...) hoặc null",
  "confidence": "Độ tin cậy của mô hình (float 0.0 - 1.0, ưu tiên 0.7+ cho thông tin rõ ràng)"
}

Hướng dẫn trích xuất:
- Mỗi câu/đoạn có thể tạo ra 1-3 claims (ví dụ: 'Lúa ST25 đạt 8.5 tấn/ha trong vụ Đông Xuân' → 2 claims: năng suất + vụ mùa)
- Trích xuất cả thông tin định tính (màu sắc, mùi vị) và định lượng (số liệu)
- Nếu có nhiều giá trị trong một câu, tách thành nhiều claims riêng
- Ưu tiên claims có object cụ thể (số liệu hoặc mô tả rõ ràng)
- Chỉ trả về JSON hợp lệ, không kèm giải thích.
- Nếu không có claim nào, trả về []"#;

/// Extractor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Chunk documents longer than this many characters.
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    /// Retries per chunk after a 429.
    pub max_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 3000,
            chunk_size: 3000,
            overlap: 200,
            max_retries: 1,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Result of one extraction run. `quota_exhausted` marks runs where chunks
/// were dropped because the provider ran out of quota mid-document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub claims: Vec<AgriClaim>,
    pub quota_exhausted: bool,
    pub chunks_skipped: usize,
}

/// LLM-backed claim extractor.
pub struct ClaimExtractor {
    completer: Arc<dyn LlmCompleter>,
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    config: ExtractorConfig,
}

impl ClaimExtractor {
    pub fn new(
        completer: Arc<dyn LlmCompleter>,
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            completer,
            limiter,
            breaker,
            config,
        }
    }

    /// Extract claims from a text blob.
    ///
    /// Short texts are one LLM call; a 429 that survives its retry is
    /// returned as the provider error so callers can surface quota problems.
    /// Long texts are chunked and failures are absorbed per chunk.
    pub async fn extract_from_text(
        &self,
        text: &str,
    ) -> Result<ExtractionOutcome, ProviderError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(ExtractionOutcome::default());
        }

        if text.chars().count() <= self.config.chunk_threshold {
            let raw = self.call_llm_with_retry(text).await?;
            let claims = parse_claims(&raw);
            return Ok(ExtractionOutcome {
                claims: dedup_claims(claims),
                quota_exhausted: false,
                chunks_skipped: 0,
            });
        }

        let chunks = chunk_text(text, self.config.chunk_size, self.config.overlap);
        info!(chunks = chunks.len(), "extracting claims from chunked document");

        let mut outcome = ExtractionOutcome::default();
        let mut all_claims = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            if !self.breaker.can_make_request() {
                warn!(chunk = index, "circuit breaker open, skipping chunk");
                outcome.chunks_skipped += 1;
                outcome.quota_exhausted = true;
                continue;
            }

            match self.call_llm_with_retry(chunk).await {
                Ok(raw) => {
                    let claims = parse_claims(&raw);
                    debug!(chunk = index, claims = claims.len(), "chunk extracted");
                    all_claims.extend(claims);
                }
                Err(e) => {
                    if e.is_quota() {
                        outcome.quota_exhausted = true;
                    }
                    warn!(chunk = index, error = %e, "chunk extraction failed, skipping");
                    outcome.chunks_skipped += 1;
                }
            }
        }

        outcome.claims = dedup_claims(all_claims);
        Ok(outcome)
    }

    /// Full pipeline for one URL: scrape, extract, stamp the source.
    pub async fn extract_from_url(
        &self,
        url: &str,
        scraper: &dyn PageScraper,
    ) -> Result<ExtractionOutcome, ProviderError> {
        if url.trim().is_empty() {
            return Ok(ExtractionOutcome::default());
        }

        let page = match scraper.scrape(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url, error = %e, "scrape failed, yielding no claims");
                return Ok(ExtractionOutcome::default());
            }
        };
        if page.text.trim().is_empty() {
            return Ok(ExtractionOutcome::default());
        }

        let mut outcome = self.extract_from_text(&page.text).await?;
        for claim in &mut outcome.claims {
            claim.source_url = Some(url.to_string());
        }
        Ok(outcome)
    }

    /// One guarded LLM call with at most `max_retries` backoff retries on 429.
    async fn call_llm_with_retry(&self, chunk: &str) -> Result<String, ProviderError> {
        let user_prompt = format!("Input Text:\n{chunk}");
        let mut attempt = 0;

        loop {
            self.limiter.wait().await;
            self.breaker.record_request();

            match self
                .completer
                .complete(EXTRACTION_SYSTEM_PROMPT, &user_prompt)
                .await
            {
                Ok(raw) => {
                    self.breaker.record_success();
                    return Ok(raw);
                }
                Err(e) => {
                    self.breaker.record_failure(e.is_rate_limited());

                    if e.is_rate_limited() && attempt < self.config.max_retries {
                        if !self.breaker.can_make_request() {
                            warn!("circuit breaker opened during retry, giving up on chunk");
                            return Err(e);
                        }
                        let delay = retry_delay(attempt, &self.config.backoff, e.retry_after());
                        warn!(
                            attempt,
                            delay_s = delay.as_secs(),
                            "rate limit hit, backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(e);
                }
            }
        }
    }
}

/// Parse the LLM response into validated claims. Tries a full JSON parse,
/// then the first `[` to last `]` slice, then gives up with no claims.
fn parse_claims(raw: &str) -> Vec<AgriClaim> {
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            let start = raw.find('[');
            let end = raw.rfind(']');
            match (start, end) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str(&raw[start..=end]).ok()
                }
                _ => None,
            }
        }
    };

    let Some(serde_json::Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| AgriClaim::from_value(item).ok())
        .collect()
}

/// Drop duplicate claims by the raw-cased `(subject, predicate, object)`
/// triple, keeping the first occurrence.
fn dedup_claims(claims: Vec<AgriClaim>) -> Vec<AgriClaim> {
    let mut seen = HashSet::new();
    claims
        .into_iter()
        .filter(|claim| seen.insert(claim.dedup_key()))
        .collect()
}
