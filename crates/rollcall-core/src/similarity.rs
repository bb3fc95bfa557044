//! Pairwise similarity between feature vector components.
//!
//! Both scores live in [0, 1] where 1 means identical. Mismatched lengths
//! score 0 rather than erroring: a vector that cannot be compared is simply
//! not similar.

/// Expected upper bound on the mean per-coordinate landmark distance.
const MAX_LANDMARK_DISTANCE: f64 = 100.0;

/// Cosine similarity of two descriptor vectors, mapped from [-1, 1] into [0, 1].
///
/// Returns 0 when lengths differ or either vector has zero magnitude.
/// Each vector is scaled by its largest component first, so sums of squares
/// cannot overflow for large finite inputs.
pub fn descriptor_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (scale_a, scale_b) = (max_abs(a), max_abs(b));
    if scale_a == 0.0 || scale_b == 0.0 {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !cosine.is_finite() {
        return 0.0;
    }
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

/// Landmark similarity from the mean absolute per-coordinate distance.
///
/// Returns 0 when lengths differ or there are no landmarks to compare.
pub fn landmark_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let total: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    let mean = total / a.len() as f64;

    (1.0 - mean / MAX_LANDMARK_DISTANCE).max(0.0)
}
