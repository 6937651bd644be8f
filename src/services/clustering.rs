//! Partitioning posts into a fixed number of groups by k-means over their
//! embeddings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::embedding::EmbeddingService;
use crate::services::similarity::{embed_checked, DEFAULT_EMBED_CHUNK};
use crate::ScopeError;

/// k-means settings. The seed makes partitions reproducible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansSettings {
    pub seed: u64,
    pub max_iterations: u64,
    pub tolerance: f64,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

pub struct ClusterPartitioner {
    embedding: Arc<dyn EmbeddingService>,
    timeout: Duration,
    chunk_size: usize,
    settings: KMeansSettings,
}

impl ClusterPartitioner {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        timeout: Duration,
        settings: KMeansSettings,
    ) -> Self {
        Self {
            embedding,
            timeout,
            chunk_size: DEFAULT_EMBED_CHUNK,
            settings,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Split `texts` into exactly `k` groups of texts.
    pub async fn partition(&self, texts: &[String], k: usize) -> Result<Vec<Vec<String>>, ScopeError> {
        let groups = self.partition_indices(texts, k).await?;
        Ok(groups
            .into_iter()
            .map(|group| group.into_iter().map(|i| texts[i].clone()).collect())
            .collect())
    }

    /// Split `texts` into exactly `k` groups of positions into `texts`.
    pub async fn partition_indices(
        &self,
        texts: &[String],
        k: usize,
    ) -> Result<Vec<Vec<usize>>, ScopeError> {
        validate_k(texts.len(), k)?;
        let embeddings = embed_checked(
            self.embedding.as_ref(),
            texts,
            self.timeout,
            self.chunk_size,
        )
        .await?;
        let labels = assign_clusters(&embeddings, k, &self.settings)?;

        let mut groups = vec![Vec::new(); k];
        for (index, label) in labels.into_iter().enumerate() {
            groups[label].push(index);
        }
        info!(
            "Partitioned {} texts into {} clusters (sizes: {:?})",
            texts.len(),
            k,
            groups.iter().map(Vec::len).collect::<Vec<_>>()
        );
        Ok(groups)
    }
}

fn validate_k(n: usize, k: usize) -> Result<(), ScopeError> {
    if n == 0 {
        return Err(ScopeError::InvalidInput(
            "Cannot partition an empty set of texts".to_string(),
        ));
    }
    if k == 0 {
        return Err(ScopeError::InvalidInput(
            "Cluster count must be at least 1".to_string(),
        ));
    }
    if k > n {
        return Err(ScopeError::InvalidInput(format!(
            "Cluster count {} exceeds number of texts {}",
            k, n
        )));
    }
    Ok(())
}

/// Cluster label in `0..k` for every embedding.
///
/// Labels are numbered by first appearance. When there are no more distinct
/// vectors than clusters, each distinct vector gets its own label and the
/// remaining labels stay unused.
pub fn assign_clusters(
    embeddings: &[Vec<f32>],
    k: usize,
    settings: &KMeansSettings,
) -> Result<Vec<usize>, ScopeError> {
    validate_k(embeddings.len(), k)?;

    let mut distinct: HashMap<Vec<u32>, usize> = HashMap::new();
    let by_vector: Vec<usize> = embeddings
        .iter()
        .map(|e| {
            let key: Vec<u32> = e.iter().map(|x| x.to_bits()).collect();
            let next = distinct.len();
            *distinct.entry(key).or_insert(next)
        })
        .collect();

    if distinct.len() <= k {
        debug!(
            distinct = distinct.len(),
            k, "fewer distinct embeddings than clusters, assigning directly"
        );
        return Ok(by_vector);
    }

    let n = embeddings.len();
    let dims = embeddings[0].len();
    let data: Vec<f64> = embeddings
        .iter()
        .flat_map(|e| e.iter().map(|&x| x as f64))
        .collect();
    let records = Array2::from_shape_vec((n, dims), data)
        .map_err(|e| ScopeError::provider(format!("Failed to build embedding matrix: {}", e)))?;
    let dataset = DatasetBase::new(records, Array1::from_elem(n, ()));

    let rng = StdRng::seed_from_u64(settings.seed);
    let model = KMeans::params_with_rng(k, rng)
        .max_n_iterations(settings.max_iterations)
        .tolerance(settings.tolerance)
        .fit(&dataset)
        .map_err(|e| ScopeError::provider(format!("K-means clustering failed: {}", e)))?;

    let predictions = model.predict(&dataset);
    Ok(relabel_by_first_appearance(predictions.iter().copied(), k))
}

fn relabel_by_first_appearance(labels: impl Iterator<Item = usize>, k: usize) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    labels
        .map(|label| {
            let next = mapping.len();
            (*mapping.entry(label).or_insert(next)).min(k - 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_obvious_groups() {
        let embeddings = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.9, 0.1, 0.0, 0.0],
            vec![0.0, 0.0, 0.1, 0.9],
            vec![0.95, 0.05, 0.0, 0.0],
            vec![0.0, 0.0, 0.05, 0.95],
        ];
        let labels = assign_clusters(&embeddings, 2, &KMeansSettings::default()).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let embeddings: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i % 7) as f32, (i % 3) as f32, (i / 5) as f32])
            .collect();
        let settings = KMeansSettings::default();
        let a = assign_clusters(&embeddings, 3, &settings).unwrap();
        let b = assign_clusters(&embeddings, 3, &settings).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_degenerate_identical_inputs() {
        let embeddings = vec![vec![1.0, 0.0]; 4];
        let labels = assign_clusters(&embeddings, 3, &KMeansSettings::default()).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_degenerate_distinct_in_first_appearance_order() {
        let embeddings = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels = assign_clusters(&embeddings, 3, &KMeansSettings::default()).unwrap();
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_invalid_k() {
        let embeddings = vec![vec![1.0], vec![2.0]];
        let settings = KMeansSettings::default();
        assert!(matches!(
            assign_clusters(&embeddings, 0, &settings),
            Err(ScopeError::InvalidInput(_))
        ));
        assert!(matches!(
            assign_clusters(&embeddings, 3, &settings),
            Err(ScopeError::InvalidInput(_))
        ));
        assert!(matches!(
            assign_clusters(&[], 1, &settings),
            Err(ScopeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_relabel_by_first_appearance() {
        assert_eq!(
            relabel_by_first_appearance([2, 2, 0, 1, 0].into_iter(), 3),
            vec![0, 0, 1, 2, 1]
        );
    }
}
