//! NLI Judge: pairwise claim comparison for contradiction detection.
//!
//! Classifies a pair of claims as SUPPORTED, CONTRADICTED or NEUTRAL using a
//! ladder of shortcut rules, embedding similarity and finally an LLM call,
//! with results persisted in a content-addressed disk cache.

pub mod cache;
pub mod judge;
pub mod types;

pub use cache::JudgeCache;
pub use judge::{cluster_by_semantic_similarity, NliJudge, NLI_JUDGE_SYSTEM_PROMPT};
pub use types::{ClaimRelation, ContradictionDetail, GroupContradictions, Judgment};
