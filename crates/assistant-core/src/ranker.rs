//! ============================================================================
//! Similarity Ranker - Cosine scoring over one owner's profile vectors
//! ============================================================================
//! Per-owner vector sets are small, so ranking is a synchronous full scan:
//! score every candidate, stable-sort descending, truncate to k.
//! ============================================================================

use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::types::{OwnerId, ProfileVector, RankedResult};

/// Cosine similarity of two equal-length vectors, clamped to [-1, 1].
///
/// Returns 0.0 when either vector has zero norm, the lengths differ, or the
/// result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Rank candidates against a query vector.
///
/// Output is at most `k` long, scores are non-increasing, and equal scores
/// keep the candidates' original order. Candidates whose dimensionality does
/// not match the query are skipped. An empty candidate set yields an empty
/// list.
pub fn rank(query: &[f32], candidates: &[ProfileVector], k: usize) -> Vec<RankedResult> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<RankedResult> = candidates
        .iter()
        .filter(|candidate| {
            let matches = candidate.vector.len() == query.len();
            if !matches {
                warn!(
                    "Skipping profile {}: dimension {} does not match query dimension {}",
                    candidate.profile_id,
                    candidate.vector.len(),
                    query.len()
                );
            }
            matches
        })
        .map(|candidate| RankedResult {
            profile_id: candidate.profile_id.clone(),
            owner_id: candidate.owner_id.clone(),
            score: cosine_similarity(query, &candidate.vector),
            source_text: candidate.source_text.clone(),
        })
        .collect();

    // sort_by is stable: ties stay in candidate order
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}

/// Rank only the candidates that belong to `owner`.
///
/// Stores already return per-owner sets; anything else is dropped here so a
/// faulty store can never leak another owner's profiles into a result.
pub fn rank_for_owner(
    owner: &OwnerId,
    query: &[f32],
    candidates: &[ProfileVector],
    k: usize,
) -> Vec<RankedResult> {
    let foreign = candidates.iter().filter(|c| &c.owner_id != owner).count();
    if foreign > 0 {
        warn!(
            "Dropping {} candidate vectors not owned by {} before ranking",
            foreign, owner
        );
        let own: Vec<ProfileVector> = candidates
            .iter()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect();
        return rank(query, &own, k);
    }

    let results = rank(query, candidates, k);
    debug!(
        "Ranked {} of {} profiles for owner {}",
        results.len(),
        candidates.len(),
        owner
    );
    results
}
