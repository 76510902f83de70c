//! Embedding vector utilities

use serde_json::Value;

use crate::{error::ClientError, Result};

/// Norms below this are treated as zero
const ZERO_NORM_EPSILON: f64 = 1e-10;

fn norm(vector: &[f64]) -> f64 {
    vector.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine similarity of two vectors
///
/// # Errors
/// Returns `Validation` if either vector is empty or their dimensions differ.
/// A zero vector has similarity 0.0 with everything.
pub fn calculate_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(ClientError::Validation(
            "Embedding vectors cannot be empty".to_string(),
        ));
    }
    if a.len() != b.len() {
        return Err(ClientError::Validation(format!(
            "Embedding dimensions do not match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a < ZERO_NORM_EPSILON || norm_b < ZERO_NORM_EPSILON {
        return Ok(0.0);
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Scale a vector to unit length; zero vectors are returned unchanged
pub fn normalize_vector(vector: &[f64]) -> Vec<f64> {
    let n = norm(vector);
    if n < ZERO_NORM_EPSILON {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / n).collect()
}

/// Similarity of `query` against every candidate, in candidate order
pub fn batch_calculate_similarities(query: &[f64], candidates: &[Vec<f64>]) -> Result<Vec<f64>> {
    candidates
        .iter()
        .map(|candidate| calculate_similarity(query, candidate))
        .collect()
}

/// The `k` most similar candidates as `(index, similarity)`, best first
pub fn top_k_similarities(
    query: &[f64],
    candidates: &[Vec<f64>],
    k: usize,
) -> Result<Vec<(usize, f64)>> {
    let mut scored: Vec<(usize, f64)> = batch_calculate_similarities(query, candidates)?
        .into_iter()
        .enumerate()
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    Ok(scored)
}

/// Pull an embedding vector out of a raw API response
///
/// Reads `embedding`, or the first entry of `embeddings`.
pub fn extract_embedding(response: &Value) -> Result<Vec<f64>> {
    let vector = response
        .get("embedding")
        .filter(|v| v.is_array())
        .or_else(|| response.get("embeddings").and_then(|e| e.get(0)))
        .and_then(|v| v.as_array())
        .ok_or_else(|| ClientError::Parse("Response contains no embedding".to_string()))?;

    vector
        .iter()
        .map(|x| {
            x.as_f64()
                .ok_or_else(|| ClientError::Parse(format!("Non-numeric embedding value: {}", x)))
        })
        .collect()
}
