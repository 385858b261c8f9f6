//! Re-clustering of a category's memories into subcategories.
//!
//! The clustering algorithm only needs to respect `[min_cluster_size,
//! max_clusters]`, stay stable under permutation of the input, and
//! produce a silhouette score comparable with `min_silhouette_score`.
//! This is a deterministic k-means-style pass over embedding vectors
//! (falling back to fingerprint Jaccard distance when a memory has no
//! embedding) seeded by farthest-point sampling over a canonically
//! sorted input, so the same memory set clusters identically regardless
//! of call order.

use sb_store::cosine_similarity;

use crate::memory::EvolvableMemory;

/// Distance in `[0, 1]`: cosine distance between embeddings when both
/// have one, else Jaccard distance between fingerprints, else the
/// maximum (fully dissimilar) -- a deterministic total function so
/// clustering never has to special-case missing data.
fn distance(a: &EvolvableMemory, b: &EvolvableMemory) -> f64 {
    if let (Some(ea), Some(eb)) = (&a.embedding, &b.embedding) {
        return (1.0 - cosine_similarity(ea, eb)).clamp(0.0, 2.0) / 2.0;
    }
    if let (Some(fa), Some(fb)) = (&a.fingerprint, &b.fingerprint) {
        return 1.0 - fa.estimate_jaccard_similarity(fb);
    }
    1.0
}

/// A cluster of memory indices (into the canonically-sorted input slice).
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<usize>,
}

/// Re-cluster `memories` into between `min_clusters` and `max_clusters`
/// groups. Input order does not affect the result: memories are sorted
/// by id before clustering begins.
pub fn cluster_memories(
    memories: &[EvolvableMemory],
    min_clusters: usize,
    max_clusters: usize,
) -> (Vec<EvolvableMemory>, Vec<Cluster>) {
    let mut sorted: Vec<EvolvableMemory> = memories.to_vec();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let n = sorted.len();
    if n == 0 {
        return (sorted, vec![]);
    }

    let k = min_clusters.max(1).min(max_clusters.max(1)).min(n);
    if k <= 1 {
        return (sorted, vec![Cluster { members: (0..n).collect() }]);
    }

    // Farthest-point seeding: start from index 0 (canonical order makes
    // this deterministic), repeatedly add the point farthest from every
    // seed chosen so far.
    let mut seeds = vec![0usize];
    while seeds.len() < k {
        let next = (0..n)
            .filter(|i| !seeds.contains(i))
            .max_by(|&i, &j| {
                let di = seeds.iter().map(|&s| distance(&sorted[i], &sorted[s])).fold(f64::MAX, f64::min);
                let dj = seeds.iter().map(|&s| distance(&sorted[j], &sorted[s])).fold(f64::MAX, f64::min);
                di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("n > seeds.len() guarantees a candidate remains");
        seeds.push(next);
    }

    let mut assignment: Vec<usize> = vec![0; n];
    for _ in 0..8 {
        // Assign each point to its nearest seed.
        for i in 0..n {
            let (best_cluster, _) = seeds
                .iter()
                .enumerate()
                .map(|(c, &s)| (c, distance(&sorted[i], &sorted[s])))
                .fold((0usize, f64::MAX), |acc, cur| if cur.1 < acc.1 { cur } else { acc });
            assignment[i] = best_cluster;
        }
        // Recompute seeds as the medoid (member with smallest total
        // distance to the rest of its cluster) for stability.
        let mut changed = false;
        for (c, seed) in seeds.iter_mut().enumerate() {
            let members: Vec<usize> = (0..n).filter(|&i| assignment[i] == c).collect();
            if members.is_empty() {
                continue;
            }
            let medoid = *members
                .iter()
                .min_by(|&&i, &&j| {
                    let di: f64 = members.iter().map(|&m| distance(&sorted[i], &sorted[m])).sum();
                    let dj: f64 = members.iter().map(|&m| distance(&sorted[j], &sorted[m])).sum();
                    di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap();
            if medoid != *seed {
                changed = true;
            }
            *seed = medoid;
        }
        if !changed {
            break;
        }
    }

    let mut clusters: Vec<Cluster> = (0..seeds.len())
        .map(|c| Cluster { members: (0..n).filter(|&i| assignment[i] == c).collect() })
        .filter(|c| !c.members.is_empty())
        .collect();
    clusters.sort_by_key(|c| c.members[0]);

    (sorted, clusters)
}

/// Silhouette score (mean over all points) in `[-1, 1]`, higher is
/// better. `clusters` partitions indices into `sorted`.
pub fn silhouette_score(sorted: &[EvolvableMemory], clusters: &[Cluster]) -> f64 {
    if sorted.len() < 2 || clusters.len() < 2 {
        return 0.0;
    }

    let mut membership = vec![0usize; sorted.len()];
    for (c, cluster) in clusters.iter().enumerate() {
        for &i in &cluster.members {
            membership[i] = c;
        }
    }

    let mut total = 0.0;
    let mut counted = 0usize;
    for i in 0..sorted.len() {
        let own = membership[i];
        let own_members: Vec<usize> =
            clusters[own].members.iter().copied().filter(|&m| m != i).collect();
        if own_members.is_empty() {
            continue; // singleton cluster contributes no silhouette term
        }
        let a: f64 = own_members.iter().map(|&m| distance(&sorted[i], &sorted[m])).sum::<f64>()
            / own_members.len() as f64;

        let b = clusters
            .iter()
            .enumerate()
            .filter(|(c, _)| *c != own)
            .map(|(_, other)| {
                other.members.iter().map(|&m| distance(&sorted[i], &sorted[m])).sum::<f64>()
                    / other.members.len() as f64
            })
            .fold(f64::MAX, f64::min);

        let denom = a.max(b);
        let s = if denom == 0.0 { 0.0 } else { (b - a) / denom };
        total += s;
        counted += 1;
    }

    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(id: &str, embedding: Vec<f32>) -> EvolvableMemory {
        EvolvableMemory::new(id, id).with_embedding(embedding)
    }

    #[test]
    fn clustering_respects_bounds() {
        let memories: Vec<EvolvableMemory> = (0..10)
            .map(|i| mem(&format!("m{i:02}"), vec![i as f32, 0.0]))
            .collect();
        let (sorted, clusters) = cluster_memories(&memories, 2, 4);
        assert_eq!(sorted.len(), 10);
        assert!(clusters.len() >= 2 && clusters.len() <= 4);
    }

    #[test]
    fn clustering_is_stable_under_permutation() {
        let memories: Vec<EvolvableMemory> = (0..8)
            .map(|i| mem(&format!("m{i:02}"), vec![(i % 2) as f32 * 10.0, i as f32]))
            .collect();
        let mut shuffled = memories.clone();
        shuffled.reverse();

        let (sorted_a, clusters_a) = cluster_memories(&memories, 2, 3);
        let (sorted_b, clusters_b) = cluster_memories(&shuffled, 2, 3);

        let ids_a: Vec<Vec<&str>> = clusters_a
            .iter()
            .map(|c| {
                let mut ids: Vec<&str> = c.members.iter().map(|&i| sorted_a[i].id.as_str()).collect();
                ids.sort();
                ids
            })
            .collect();
        let ids_b: Vec<Vec<&str>> = clusters_b
            .iter()
            .map(|c| {
                let mut ids: Vec<&str> = c.members.iter().map(|&i| sorted_b[i].id.as_str()).collect();
                ids.sort();
                ids
            })
            .collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn silhouette_is_high_for_well_separated_clusters() {
        let memories: Vec<EvolvableMemory> = vec![
            mem("a1", vec![0.0, 0.0]),
            mem("a2", vec![0.1, 0.0]),
            mem("b1", vec![10.0, 10.0]),
            mem("b2", vec![10.1, 10.0]),
        ];
        let (sorted, clusters) = cluster_memories(&memories, 2, 2);
        let score = silhouette_score(&sorted, &clusters);
        assert!(score > 0.0, "expected positive silhouette, got {score}");
    }
}
