//! Density-based duplicate detection (SPEC_FULL §4.D "Optional density-based mode").
//!
//! `linfa_clustering::Dbscan` clusters by Euclidean distance. Cosine
//! distance and Euclidean distance coincide (up to a fixed scale) once every
//! vector is normalized to unit length: for unit vectors `u`, `v`,
//! `||u - v||^2 = 2 - 2*cos(u, v) = 2 * cosine_distance(u, v)`. So an `eps`
//! expressed as a cosine distance converts to a Euclidean tolerance of
//! `sqrt(2 * eps)` once inputs are unit-normalized, which is what
//! [`cluster_duplicates`] does before calling into `linfa`.

use std::collections::HashMap;

use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use ndarray::Array2;

use pulse_core::domain::{MessageId, PublishedId, RejectionReason};

use crate::engine::DedupCandidate;

fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector.to_vec()
    } else {
        vector.iter().map(|x| x / norm).collect()
    }
}

pub fn cluster_duplicates(
    published_ids: &[PublishedId],
    published_matrix: &[Vec<f32>],
    candidates: &[DedupCandidate],
    candidate_vectors: &[Vec<f32>],
    cosine_eps: f32,
    min_samples: usize,
) -> (Vec<MessageId>, HashMap<MessageId, RejectionReason>) {
    let mut unique = Vec::new();
    let mut rejections = HashMap::new();

    if candidates.is_empty() {
        return (unique, rejections);
    }

    let published_count = published_ids.len();
    let dims = candidate_vectors.first().map(|v| v.len()).unwrap_or(0);
    if dims == 0 {
        return (candidates.iter().map(|c| c.message_id).collect(), rejections);
    }

    let total = published_count + candidates.len();
    let mut flat = Vec::with_capacity(total * dims);
    for row in published_matrix {
        flat.extend(normalize(row));
    }
    for row in candidate_vectors {
        flat.extend(normalize(row));
    }

    let observations = match Array2::from_shape_vec((total, dims), flat) {
        Ok(arr) => arr,
        Err(_) => return (candidates.iter().map(|c| c.message_id).collect(), rejections),
    };

    let euclidean_eps: f32 = (2.0 * cosine_eps.max(0.0)).sqrt();
    let labels = Dbscan::params(min_samples.max(2))
        .tolerance(euclidean_eps)
        .transform(&observations);

    let published_labels = &labels.as_slice().unwrap()[..published_count];
    let candidate_labels = &labels.as_slice().unwrap()[published_count..];

    let published_cluster_ids: std::collections::HashSet<usize> =
        published_labels.iter().filter_map(|l| *l).collect();

    // Group surviving candidates by cluster id so a newly formed cluster
    // among candidates-only collapses to its highest-`tie_break_score` member.
    let mut by_cluster: HashMap<usize, Vec<usize>> = HashMap::new();

    for (i, label) in candidate_labels.iter().enumerate() {
        match label {
            None => unique.push(candidates[i].message_id),
            Some(cluster_id) if published_cluster_ids.contains(cluster_id) => {
                rejections.insert(candidates[i].message_id, RejectionReason::IsDuplicate);
            }
            Some(cluster_id) => {
                by_cluster.entry(*cluster_id).or_default().push(i);
            }
        }
    }

    for (_cluster_id, members) in by_cluster {
        if members.len() == 1 {
            unique.push(candidates[members[0]].message_id);
            continue;
        }
        let representative = members
            .iter()
            .copied()
            .max_by_key(|&i| candidates[i].tie_break_score)
            .unwrap();
        for i in members {
            if i == representative {
                unique.push(candidates[i].message_id);
            } else {
                rejections.insert(candidates[i].message_id, RejectionReason::IsDuplicate);
            }
        }
    }

    (unique, rejections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, score: i64) -> DedupCandidate {
        DedupCandidate { message_id: id, text: String::new(), tie_break_score: score }
    }

    #[test]
    fn noise_points_are_unique() {
        let (unique, rejections) = cluster_duplicates(
            &[],
            &[],
            &[candidate(1, 0), candidate(2, 0)],
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            0.22,
            2,
        );
        assert_eq!(unique.len(), 2);
        assert!(rejections.is_empty());
    }

    #[test]
    fn matches_published_cluster_are_rejected() {
        let (unique, rejections) = cluster_duplicates(
            &[100],
            &[vec![1.0, 0.0, 0.0]],
            &[candidate(1, 0)],
            &[vec![0.99, 0.01, 0.0]],
            0.22,
            2,
        );
        assert!(unique.is_empty());
        assert_eq!(rejections.len(), 1);
    }
}
