//! Writer stage: rule-based summary, no LLM involved.

use claim_resolver::ResolvedClaim;

/// One line per resolved claim:
/// `subject - predicate: object (Bối cảnh: context) Nguồn: up-to-3-urls`.
pub fn format_resolved_claim(resolved: &ResolvedClaim) -> String {
    let claim = &resolved.gold_claim;
    let mut parts: Vec<String> = Vec::new();

    let mut base = claim.subject.clone();
    if !claim.predicate.is_empty() {
        base.push_str(&format!(" - {}", claim.predicate));
    }
    if let Some(object) = &claim.object {
        base.push_str(&format!(": {object}"));
    }
    parts.push(base);

    if let Some(context) = &claim.context {
        parts.push(format!("(Bối cảnh: {context})"));
    }

    if !resolved.support_urls.is_empty() {
        let urls: Vec<&str> = resolved
            .support_urls
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        parts.push(format!("Nguồn: {}", urls.join(", ")));
    }

    parts.join(" ")
}

/// Build the operator-facing summary.
pub fn write_summary(crop: &str, resolved: &[ResolvedClaim]) -> String {
    let crop = crop.trim();

    if resolved.is_empty() {
        return format!(
            "Chưa tìm được thông tin tin cậy cho '{crop}' từ các nguồn web hiện tại. \
             Vui lòng thử lại với từ khóa cụ thể hơn."
        );
    }

    let mut lines: Vec<String> = Vec::new();
    if crop.is_empty() {
        lines.push("Kết quả tổng hợp thông tin nông nghiệp:".to_string());
    } else {
        lines.push(format!("Kết quả tổng hợp cho: {crop}"));
    }

    for (index, claim) in resolved.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, format_resolved_claim(claim)));
    }

    lines.join("\n")
}
