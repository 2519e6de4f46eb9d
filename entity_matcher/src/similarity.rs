//! Word-overlap similarity between normalized names.
//!
//! This is a heuristic rather than a metric: containment short-circuits to a
//! fixed score and there is no triangle inequality, so "is similar to" is not
//! transitive.

use std::collections::HashSet;

/// Score returned when one string contains the other.
pub const CONTAINMENT_SIMILARITY: f64 = 0.9;

/// Case-insensitive similarity in `[0, 1]`.
///
/// A string compared with itself scores [`CONTAINMENT_SIMILARITY`], not 1.0,
/// because containment is checked before word overlap. The empty string is
/// contained in every string and therefore also scores 0.9.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_with(a, b, CONTAINMENT_SIMILARITY)
}

/// [`similarity`] with a configurable containment score.
pub fn similarity_with(a: &str, b: &str, containment: f64) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a.contains(&b) || b.contains(&a) {
        return containment;
    }

    jaccard(&a, &b)
}

/// Jaccard index over whitespace-separated word sets; 0.0 if either set is empty.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let common = words_a.intersection(&words_b).count();
    let all = words_a.union(&words_b).count();
    common as f64 / all as f64
}
