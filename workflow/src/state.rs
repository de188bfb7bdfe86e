//! Shared state record threaded through the pipeline stages.

use agri_claims::AgriClaim;
use claim_resolver::ResolvedClaim;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Diagnostics accumulated across stages. Non-fatal errors land in `errors`
/// and never abort the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugInfo {
    pub search_query: String,
    pub fallback_queries: Vec<String>,
    pub num_urls_after_dedup: usize,
    pub num_urls_after_trust_filter: usize,
    pub num_search_results: usize,
    pub num_claims: usize,
    pub num_resolved_claims: usize,
    pub errors: Vec<String>,
    pub quota_exhausted: bool,
    pub cancelled: bool,
}

/// Pipeline state for one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    /// Crop or entity under analysis, as entered by the operator.
    pub crop: String,
    /// Search query actually used.
    pub query: String,
    pub search_results: Vec<String>,
    pub claims: Vec<AgriClaim>,
    pub resolved_claims: Vec<ResolvedClaim>,
    pub summary: String,
    pub debug: DebugInfo,
}

/// Caller-supplied cancellation signal. Pending extraction URLs are skipped
/// once the flag is raised; results computed so far are still returned.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
