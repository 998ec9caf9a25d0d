//! Cosine similarity and deterministic top-k ranking.

use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Keep the `top_k` best `(item, score)` pairs with `score >= threshold`.
///
/// `scored` must be in insertion order. The sort is stable, so equal scores
/// keep that order and the earliest inserted item wins a tie. NaN scores
/// never pass the threshold.
pub fn rank<T>(scored: Vec<(T, f32)>, top_k: usize, threshold: f32) -> Vec<(T, f32)> {
    let mut kept: Vec<(T, f32)> =
        scored.into_iter().filter(|(_, score)| *score >= threshold).collect();
    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    kept.truncate(top_k);
    kept
}
