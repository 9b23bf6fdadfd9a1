//! Vector similarity helpers (SPEC_FULL §4.B).
//!
//! Zero-norm inputs yield `0.0` rather than `NaN` — both single-pair and
//! batched comparisons are expected to be used directly as duplicate-score
//! thresholds, so a `NaN` leaking through would silently defeat every
//! downstream `>=` comparison.

/// Cosine similarity between two equal-length vectors, in `[-1, 1]`.
/// Returns `0.0` if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine similarity between `query` and every row of `matrix`, in order.
/// Rows with zero norm yield `0.0`, same as the pairwise case.
pub fn batch_cosine_similarity(query: &[f32], matrix: &[Vec<f32>]) -> Vec<f32> {
    matrix.iter().map(|row| cosine_similarity(query, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_maximally_similar() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_zero_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_never_produces_nan() {
        let result = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(result, 0.0);
        assert!(!result.is_nan());
    }

    #[test]
    fn batch_matches_pairwise() {
        let query = vec![1.0, 0.0];
        let matrix = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]];
        let result = batch_cosine_similarity(&query, &matrix);
        assert_eq!(result.len(), 3);
        assert!((result[0] - 1.0).abs() < 1e-6);
        assert!(result[1].abs() < 1e-6);
        assert_eq!(result[2], 0.0);
    }
}
