//! Local embedding model implementation using candle.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::embedding::candle_backend::{download_model, select_device, BertEmbedder};
use crate::embedding::EmbeddingService;
use crate::ScopeError;

pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Configuration for embedding model initialization.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// HuggingFace repository of a BERT-family sentence encoder
    pub model_repo: String,
    /// Optional cache directory for model files
    pub cache_dir: Option<PathBuf>,
    /// Texts per forward pass
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_repo: DEFAULT_LOCAL_MODEL.to_string(),
            cache_dir: None,
            batch_size: 32,
        }
    }
}

/// Local embedding service backed by a candle [`BertEmbedder`].
///
/// Loaded once per process and shared behind an `Arc`. Forward passes run on
/// `spawn_blocking` since inference is synchronous and CPU/GPU-bound.
pub struct LocalEmbeddingService {
    embedder: Option<Arc<BertEmbedder>>,
    available: bool,
    dimensions: usize,
    batch_size: usize,
    model_repo: String,
}

impl LocalEmbeddingService {
    /// Create a new local embedding service.
    ///
    /// Downloads and loads the model eagerly. If loading fails (e.g., no
    /// internet on first run), the service is unavailable but does not error.
    pub fn new(config: EmbeddingConfig) -> Self {
        let batch_size = config.batch_size.max(1);
        let unavailable = |model_repo: String| Self {
            embedder: None,
            available: false,
            dimensions: 384,
            batch_size,
            model_repo,
        };

        let files = match download_model(&config.model_repo, config.cache_dir.as_deref()) {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    "Failed to download embedding model {}: {}. Embedding service will be unavailable.",
                    config.model_repo, e
                );
                return unavailable(config.model_repo);
            }
        };

        match BertEmbedder::new(&files, select_device()) {
            Ok(embedder) => {
                info!(
                    "Embedding model loaded ({}, {} dimensions via candle)",
                    config.model_repo,
                    embedder.hidden_size()
                );
                Self {
                    dimensions: embedder.hidden_size(),
                    embedder: Some(Arc::new(embedder)),
                    available: true,
                    batch_size,
                    model_repo: config.model_repo,
                }
            }
            Err(e) => {
                warn!(
                    "Failed to load embedding model {}: {}. Embedding service will be unavailable.",
                    config.model_repo, e
                );
                unavailable(config.model_repo)
            }
        }
    }

    pub fn model_repo(&self) -> &str {
        &self.model_repo
    }

    fn embedder(&self) -> Result<Arc<BertEmbedder>, ScopeError> {
        if !self.available {
            return Err(ScopeError::provider("Embedding service is not available"));
        }
        self.embedder
            .clone()
            .ok_or_else(|| ScopeError::provider("Embedding model not loaded"))
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScopeError::provider("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        let embedder = self.embedder()?;
        let texts = texts.to_vec();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || {
            let mut embeddings = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(batch_size) {
                embeddings.extend(embedder.embed(chunk)?);
            }
            Ok::<Vec<Vec<f32>>, anyhow::Error>(embeddings)
        })
        .await
        .map_err(|e| ScopeError::provider(format!("Task join error: {}", e)))?
        .map_err(|e| ScopeError::provider(format!("Embedding error: {}", e)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
