//! AgriClaim: the fundamental unit of the claim fusion pipeline.
//!
//! A claim is a `(subject, predicate, object, context, confidence, source_url)`
//! tuple extracted from Vietnamese agricultural text, e.g.
//! `("Lúa ST25", "Năng suất", "8.5 tấn/ha", "Vụ Đông Xuân 2023", 0.8, ...)`.

use serde::{Deserialize, Serialize};

/// Errors produced when constructing or decoding a claim.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("claim subject must not be empty")]
    EmptySubject,

    #[error("claim predicate must not be empty")]
    EmptyPredicate,

    #[error("claim confidence {0} outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),

    #[error("claim JSON has unexpected shape: {0}")]
    InvalidShape(String),
}

/// A single factual claim about an agricultural entity.
///
/// `subject` and `predicate` keep their original casing for display; grouping
/// and comparison use [`AgriClaim::group_key`], which trims and case-folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgriClaim {
    /// Canonicalized entity name (e.g. "Lúa ST25", "Bệnh đạo ôn").
    pub subject: String,
    /// Attribute or relation (e.g. "Năng suất", "Thời gian sinh trưởng").
    pub predicate: String,
    /// Concrete value including unit (e.g. "8.5 tấn/ha", "95-100 ngày").
    /// `None` when the source states the attribute without a value.
    #[serde(default)]
    pub object: Option<String>,
    /// Applicability conditions (e.g. "Vụ Đông Xuân", "Vùng ven biển ĐBSCL").
    #[serde(default)]
    pub context: Option<String>,
    /// Extractor self-estimate in [0, 1].
    pub confidence: f64,
    /// URL the claim was extracted from; stamped by the URL pipeline.
    #[serde(default)]
    pub source_url: Option<String>,
}

impl AgriClaim {
    /// Build a validated claim.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: Option<String>,
        context: Option<String>,
        confidence: f64,
    ) -> Result<Self, ClaimError> {
        let subject = subject.into();
        let predicate = predicate.into();

        if subject.trim().is_empty() {
            return Err(ClaimError::EmptySubject);
        }
        if predicate.trim().is_empty() {
            return Err(ClaimError::EmptyPredicate);
        }
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(ClaimError::ConfidenceOutOfRange(confidence));
        }

        Ok(Self {
            subject,
            predicate,
            object,
            context,
            confidence,
            source_url: None,
        })
    }

    /// Attach the source URL (URL extraction pipeline).
    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Decode one claim from a JSON object, ignoring unknown fields and
    /// validating the result. LLM output is never trusted to be well-shaped.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ClaimError> {
        #[derive(Deserialize)]
        struct RawClaim {
            subject: String,
            predicate: String,
            #[serde(default)]
            object: Option<String>,
            #[serde(default)]
            context: Option<String>,
            confidence: f64,
            #[serde(default)]
            source_url: Option<String>,
        }

        let raw: RawClaim = serde_json::from_value(value.clone())
            .map_err(|e| ClaimError::InvalidShape(e.to_string()))?;

        let mut claim = Self::new(raw.subject, raw.predicate, raw.object, raw.context, raw.confidence)?;
        claim.source_url = raw.source_url;
        Ok(claim)
    }

    /// Case-folded grouping key `(subject, predicate)`.
    pub fn group_key(&self) -> (String, String) {
        (
            self.subject.trim().to_lowercase(),
            self.predicate.trim().to_lowercase(),
        )
    }

    /// Raw-cased dedup key `(subject, predicate, object)`. Deliberately keeps
    /// original casing, unlike [`AgriClaim::group_key`].
    pub fn dedup_key(&self) -> (String, String, Option<String>) {
        (
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
        )
    }

    /// Trimmed object value, empty string when absent.
    pub fn object_text(&self) -> &str {
        self.object.as_deref().unwrap_or("").trim()
    }

    /// Human-readable one-liner, `subject - predicate: object (Context: ...)`.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} - {}: {}",
            self.subject,
            self.predicate,
            self.object.as_deref().unwrap_or("")
        );
        if let Some(context) = &self.context {
            out.push_str(&format!(" (Context: {})", context));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim(subject: &str, predicate: &str, object: &str) -> AgriClaim {
        AgriClaim::new(subject, predicate, Some(object.to_string()), None, 0.8).unwrap()
    }

    #[test]
    fn test_valid_claim() {
        let c = claim("Lúa ST25", "Năng suất", "8.5 tấn/ha");
        assert_eq!(c.subject, "Lúa ST25");
        assert_eq!(c.object.as_deref(), Some("8.5 tấn/ha"));
    }

    #[test]
    fn test_rejects_empty_subject_and_predicate() {
        assert!(matches!(
            AgriClaim::new("  ", "Năng suất", None, None, 0.5),
            Err(ClaimError::EmptySubject)
        ));
        assert!(matches!(
            AgriClaim::new("Lúa ST25", "", None, None, 0.5),
            Err(ClaimError::EmptyPredicate)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        assert!(AgriClaim::new("Lúa ST25", "Năng suất", None, None, 1.2).is_err());
        assert!(AgriClaim::new("Lúa ST25", "Năng suất", None, None, -0.1).is_err());
        assert!(AgriClaim::new("Lúa ST25", "Năng suất", None, None, f64::NAN).is_err());
    }

    #[test]
    fn test_group_key_case_folds() {
        let c = claim("  Lúa ST25 ", " Năng Suất ", "8.5 tấn/ha");
        assert_eq!(
            c.group_key(),
            ("lúa st25".to_string(), "năng suất".to_string())
        );
        // Display casing is preserved.
        assert_eq!(c.subject, "  Lúa ST25 ");
    }

    #[test]
    fn test_from_value_ignores_unknown_fields() {
        let value = json!({
            "subject": "Lúa ST25",
            "predicate": "Giải thưởng",
            "object": "Giải nhất Gạo Ngon Thế Giới 2019",
            "context": null,
            "confidence": 0.9,
            "notes": "extra field the model invented"
        });
        let c = AgriClaim::from_value(&value).unwrap();
        assert_eq!(c.predicate, "Giải thưởng");
        assert_eq!(c.context, None);
    }

    #[test]
    fn test_from_value_rejects_invalid() {
        let missing = json!({"predicate": "Năng suất", "confidence": 0.5});
        assert!(AgriClaim::from_value(&missing).is_err());

        let bad_confidence = json!({
            "subject": "Lúa ST25",
            "predicate": "Năng suất",
            "confidence": 7.0
        });
        assert!(AgriClaim::from_value(&bad_confidence).is_err());
    }

    #[test]
    fn test_summary_includes_context() {
        let mut c = claim("Lúa ST25", "Năng suất", "8.5 tấn/ha");
        c.context = Some("Vụ Đông Xuân".to_string());
        assert_eq!(
            c.summary(),
            "Lúa ST25 - Năng suất: 8.5 tấn/ha (Context: Vụ Đông Xuân)"
        );
    }
}
