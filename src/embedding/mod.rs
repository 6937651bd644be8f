//! Embedding infrastructure for semantic similarity.
//!
//! The [`EmbeddingService`] trait abstracts the embedding capability so the
//! pipeline never knows which backend is in use. [`LocalEmbeddingService`]
//! runs a BERT sentence encoder through candle, [`RemoteEmbeddingService`]
//! calls an OpenAI-compatible `/embeddings` endpoint, and
//! [`CachedEmbeddingService`] memoizes any of them by text.

pub mod cache;
pub mod candle_backend;
pub mod model;
pub mod provider;
pub mod remote;

use async_trait::async_trait;

use crate::ScopeError;

pub use cache::CachedEmbeddingService;
pub use model::{EmbeddingConfig, LocalEmbeddingService};
pub use provider::{create_embedding_service, EmbeddingProviderConfig};
pub use remote::RemoteEmbeddingService;

/// No-op embedding service for testing.
///
/// Always reports as unavailable and returns errors for embed operations.
pub struct NoopEmbeddingService;

impl Default for NoopEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopEmbeddingService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingService for NoopEmbeddingService {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ScopeError> {
        Err(ScopeError::provider(
            "Embedding service is not available (noop)",
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        Err(ScopeError::provider(
            "Embedding service is not available (noop)",
        ))
    }

    fn dimensions(&self) -> usize {
        384 // Match all-MiniLM-L6-v2 dimensions
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Service trait for generating text embeddings.
///
/// Implementations must be deterministic for a fixed model version: the same
/// text always maps to the same vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate embedding for a single text string.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// Returns one embedding per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError>;

    /// Embedding width (e.g., 384 for MiniLM-L6).
    fn dimensions(&self) -> usize;

    /// Returns false if the model failed to load.
    fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_service_reports_unavailable() {
        let service = NoopEmbeddingService::new();
        assert!(!service.is_available());
        assert_eq!(service.dimensions(), 384);
        let err = service.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, ScopeError::Provider { .. }));
        assert!(service.embed_batch(&["a".to_string()]).await.is_err());
    }
}
