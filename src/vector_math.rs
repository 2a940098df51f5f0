use std::cmp::Ordering;

use crate::errors::RagError;

/// Cosine similarity in [-1, 1]. Fails on empty or mismatched vectors.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(RagError::InvalidInput(
            "vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(RagError::InvalidInput(format!(
            "vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let dot: f64 = query
        .iter()
        .zip(candidate.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_q: f64 = query.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_c: f64 = candidate
        .iter()
        .map(|x| (*x as f64).powi(2))
        .sum::<f64>()
        .sqrt();

    let denom = norm_q * norm_c;
    if denom <= f64::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// Ranks candidate vectors by descending cosine similarity to the query.
///
/// Returns (original index, score) pairs; equal scores keep input order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, RagError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}
