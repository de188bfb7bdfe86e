//! Claim resolver: weighted-voting fusion of multi-source claims.

pub mod numeric;
pub mod resolve;


pub use numeric::{cluster_numeric, parse_numeric, NUMERIC_CLUSTER_TOLERANCE};
pub use resolve::{
    time_weight, ResolvedClaim, Resolver, CURRENT_YEAR_BOOST, OLDER_YEAR_FACTOR,
    SEMANTIC_CLUSTER_THRESHOLD,
};
