//! The straight-line pipeline: search -> extract -> resolve -> write.

use crate::search::{build_search_query, SearchStage};
use crate::state::{CancellationFlag, DebugInfo, WorkflowState};
use crate::writer::write_summary;
use agri_claims::AgriClaim;
use agri_providers::PageScraper;
use claim_extraction::ClaimExtractor;
use claim_resolver::Resolver;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Bounded fan-out for per-URL extraction.
const EXTRACT_CONCURRENCY: usize = 4;

/// End-to-end query workflow.
pub struct AgriWorkflow {
    search: SearchStage,
    extractor: Arc<ClaimExtractor>,
    scraper: Arc<dyn PageScraper>,
    resolver: Arc<Resolver>,
}

impl AgriWorkflow {
    pub fn new(
        search: SearchStage,
        extractor: Arc<ClaimExtractor>,
        scraper: Arc<dyn PageScraper>,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self {
            search,
            extractor,
            scraper,
            resolver,
        }
    }

    /// Run the full pipeline for a crop. Per-URL failures are recorded in
    /// `debug.errors`; the pipeline always completes with whatever it got.
    pub async fn run(
        &self,
        crop: &str,
        initial_query: Option<&str>,
        cancel: Option<&CancellationFlag>,
    ) -> WorkflowState {
        let query = initial_query
            .map(str::to_string)
            .unwrap_or_else(|| build_search_query(crop));

        let mut state = WorkflowState {
            crop: crop.to_string(),
            query: query.clone(),
            ..WorkflowState::default()
        };
        state.debug.search_query = query.clone();

        // Stage 1: search.
        state.search_results = self.search.run(crop, &query, &mut state.debug).await;

        // Stage 2: extract per URL, bounded fan-out, input order preserved.
        let debug_info = std::mem::take(&mut state.debug);
        let (claims, mut debug_info) = self
            .extract_stage(&state.search_results, debug_info, cancel)
            .await;
        debug_info.num_claims = claims.len();
        state.claims = claims;
        state.debug = debug_info;

        // Stage 3: resolve.
        state.resolved_claims = self.resolver.resolve(&state.claims).await;
        state.debug.num_resolved_claims = state.resolved_claims.len();

        // Stage 4: write.
        state.summary = write_summary(crop, &state.resolved_claims);

        info!(
            crop,
            urls = state.search_results.len(),
            claims = state.claims.len(),
            resolved = state.resolved_claims.len(),
            "workflow complete"
        );
        state
    }

    async fn extract_stage(
        &self,
        urls: &[String],
        mut debug: DebugInfo,
        cancel: Option<&CancellationFlag>,
    ) -> (Vec<AgriClaim>, DebugInfo) {
        let jobs = stream::iter(urls.iter().cloned())
            .map(|url| {
                let extractor = Arc::clone(&self.extractor);
                let scraper = Arc::clone(&self.scraper);
                let cancel = cancel.cloned();
                async move {
                    if cancel.as_ref().is_some_and(CancellationFlag::is_cancelled) {
                        return (url, None);
                    }
                    let outcome = extractor.extract_from_url(&url, scraper.as_ref()).await;
                    (url, Some(outcome))
                }
            })
            .buffered(EXTRACT_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut claims = Vec::new();
        for (url, outcome) in jobs {
            match outcome {
                None => {
                    debug.cancelled = true;
                    warn!(url, "extraction skipped, workflow cancelled");
                }
                Some(Ok(outcome)) => {
                    if outcome.quota_exhausted {
                        debug.quota_exhausted = true;
                    }
                    claims.extend(outcome.claims);
                }
                Some(Err(e)) => {
                    if e.is_quota() {
                        debug.quota_exhausted = true;
                    }
                    debug.errors.push(format!("Extract error for {url}: {e}"));
                }
            }
        }

        (claims, debug)
    }
}
