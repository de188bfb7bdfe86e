//! Numeric value extraction and proximity clustering.

use agri_claims::AgriClaim;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("static regex"));

/// Relative distance threshold for joining a numeric cluster (5%).
pub const NUMERIC_CLUSTER_TOLERANCE: f64 = 0.05;

/// Extract a representative numeric value from an object string.
///
/// All decimal numbers are collected (`.` or `,` as the separator); a single
/// number stands for itself, several numbers (a range like "95-100 ngày", or
/// an enumeration) collapse to their arithmetic mean.
pub fn parse_numeric(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }

    let numbers: Vec<f64> = NUMBER_RE
        .find_iter(value)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .collect();

    if numbers.is_empty() {
        return None;
    }

    Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

/// Cluster claims with numeric values by proximity.
///
/// Sorted by value, then walked left to right with a running cluster mean: a
/// point joins the current cluster when its relative distance to the mean is
/// within the tolerance (absolute distance when the mean is zero).
pub fn cluster_numeric(mut values: Vec<(AgriClaim, f64)>) -> Vec<Vec<(AgriClaim, f64)>> {
    if values.is_empty() {
        return Vec::new();
    }

    // Stable sort keeps input order for ties.
    values.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut clusters: Vec<Vec<(AgriClaim, f64)>> = Vec::new();
    let mut current: Vec<(AgriClaim, f64)> = Vec::new();
    let mut center = values[0].1;

    for (claim, value) in values {
        if current.is_empty() {
            center = value;
            current.push((claim, value));
            continue;
        }

        let distance = if center == 0.0 {
            (value - center).abs()
        } else {
            (value - center).abs() / center.abs()
        };

        if distance <= NUMERIC_CLUSTER_TOLERANCE {
            current.push((claim, value));
            center = current.iter().map(|(_, v)| v).sum::<f64>() / current.len() as f64;
        } else {
            clusters.push(std::mem::take(&mut current));
            center = value;
            current.push((claim, value));
        }
    }

    if !current.is_empty() {
        clusters.push(current);
    }

    clusters
}
