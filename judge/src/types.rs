//! Judgment types shared by the judge and the resolver.

use serde::{Deserialize, Serialize};

/// Relation between two claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimRelation {
    /// Equivalent or mutually reinforcing statements.
    #[serde(rename = "SUPPORTED")]
    Supported,
    /// Conflicting statements about the same fact.
    #[serde(rename = "CONTRADICTED")]
    Contradicted,
    /// Unrelated statements.
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

/// Outcome of judging one ordered pair of claims.
///
/// The serialized form (the cache file payload) carries only
/// `{relation, confidence, reasoning}`; `from_cache` is set on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub relation: ClaimRelation,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip)]
    pub from_cache: bool,
}

impl Judgment {
    pub fn new(relation: ClaimRelation, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            relation,
            confidence,
            reasoning: reasoning.into(),
            from_cache: false,
        }
    }
}

/// One contradicting pair surfaced to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionDetail {
    pub claim1: String,
    pub claim2: String,
    pub reasoning: String,
    pub confidence: f64,
}

/// Pairwise judgment results over a claim group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupContradictions {
    pub has_contradictions: bool,
    pub details: Vec<ContradictionDetail>,
    /// `(i, j, relation)` for every judged pair, i < j.
    pub relations: Vec<(usize, usize, ClaimRelation)>,
}
