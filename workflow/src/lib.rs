//! Query workflow: search -> extract -> resolve -> write.

pub mod pipeline;
pub mod search;
pub mod state;
pub mod writer;

#[cfg(test)]
mod tests;

pub use pipeline::AgriWorkflow;
pub use search::{build_search_query, SearchConfig, SearchStage};
pub use state::{CancellationFlag, DebugInfo, WorkflowState};
pub use writer::{format_resolved_claim, write_summary};
