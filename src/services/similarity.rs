//! Post × narrative cosine similarity.

use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::embedding::EmbeddingService;
use crate::utils::math::bounded_cosine_similarity;
use crate::ScopeError;

/// Rows are posts in corpus order, columns are narratives in input order.
/// Every cell lies in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f32>,
}

impl SimilarityMatrix {
    fn from_embeddings(posts: &[Vec<f32>], narratives: &[Vec<f32>]) -> Self {
        let values = Array2::from_shape_fn((posts.len(), narratives.len()), |(i, j)| {
            bounded_cosine_similarity(&posts[i], &narratives[j])
        });
        Self { values }
    }

    /// Build from precomputed scores. Cells are clamped into `[-1, 1]`;
    /// non-finite and missing cells become 0.
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let values = Array2::from_shape_fn((rows.len(), cols), |(i, j)| {
            match rows[i].get(j) {
                Some(v) if v.is_finite() => v.clamp(-1.0, 1.0),
                _ => 0.0,
            }
        });
        Self { values }
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.values.get((row, col)).copied()
    }

    /// Scores of every post against narrative `col`.
    pub fn column(&self, col: usize) -> Option<Vec<f32>> {
        (col < self.cols()).then(|| self.values.column(col).to_vec())
    }

    /// Scores of post `row` against every narrative.
    pub fn row(&self, row: usize) -> Option<Vec<f32>> {
        (row < self.rows()).then(|| self.values.row(row).to_vec())
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.values.outer_iter().map(|r| r.to_vec()).collect()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.values
    }
}

impl Serialize for SimilarityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_rows())
    }
}

/// Texts per embedding request when the caller does not configure one.
pub const DEFAULT_EMBED_CHUNK: usize = 32;

/// Embed `texts` in requests of at most `chunk_size`, each under its own
/// deadline, checking that the provider returned one vector per text and that
/// all vectors share a width.
pub(crate) async fn embed_checked(
    embedding: &dyn EmbeddingService,
    texts: &[String],
    timeout: Duration,
    chunk_size: usize,
) -> Result<Vec<Vec<f32>>, ScopeError> {
    if texts.is_empty() {
        return Ok(vec![]);
    }
    let mut embeddings = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(chunk_size.max(1)) {
        let batch = tokio::time::timeout(timeout, embedding.embed_batch(chunk))
            .await
            .map_err(|_| {
                ScopeError::provider(format!(
                    "Embedding request for {} texts timed out after {:?}",
                    chunk.len(),
                    timeout
                ))
            })??;
        if batch.len() != chunk.len() {
            return Err(ScopeError::provider(format!(
                "Embedding provider returned {} vectors for {} texts",
                batch.len(),
                chunk.len()
            )));
        }
        embeddings.extend(batch);
    }

    let width = embeddings[0].len();
    if width == 0 {
        return Err(ScopeError::provider("Embedding provider returned empty vectors"));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != width) {
        return Err(ScopeError::provider(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            width,
            bad.len()
        )));
    }
    Ok(embeddings)
}

/// Computes similarity matrices through an injected embedding provider.
pub struct SimilarityEngine {
    embedding: Arc<dyn EmbeddingService>,
    timeout: Duration,
    chunk_size: usize,
}

impl SimilarityEngine {
    /// `timeout` bounds each embedding request, not the whole computation.
    pub fn new(embedding: Arc<dyn EmbeddingService>, timeout: Duration) -> Self {
        Self {
            embedding,
            timeout,
            chunk_size: DEFAULT_EMBED_CHUNK,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Similarity of every post to every narrative.
    ///
    /// Each narrative and each post is embedded exactly once.
    pub async fn compute(
        &self,
        posts: &[String],
        narratives: &[String],
    ) -> Result<SimilarityMatrix, ScopeError> {
        if posts.is_empty() {
            return Err(ScopeError::InvalidInput(
                "No posts to compare".to_string(),
            ));
        }
        if narratives.is_empty() {
            return Err(ScopeError::InvalidInput(
                "At least one narrative is required".to_string(),
            ));
        }

        debug!(
            posts = posts.len(),
            narratives = narratives.len(),
            "computing similarity matrix"
        );

        let narrative_embeddings = embed_checked(
            self.embedding.as_ref(),
            narratives,
            self.timeout,
            self.chunk_size,
        )
        .await?;
        let post_embeddings =
            embed_checked(self.embedding.as_ref(), posts, self.timeout, self.chunk_size).await?;

        if narrative_embeddings[0].len() != post_embeddings[0].len() {
            return Err(ScopeError::provider(format!(
                "Embedding dimension mismatch: narratives have {}, posts have {}",
                narrative_embeddings[0].len(),
                post_embeddings[0].len()
            )));
        }

        Ok(SimilarityMatrix::from_embeddings(
            &post_embeddings,
            &narrative_embeddings,
        ))
    }
}
