//! Embeddings from an OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::embedding::EmbeddingService;
use crate::generation::client::OpenAiClient;
use crate::ScopeError;

/// Chunk requests in flight at once.
const MAX_CONCURRENT_REQUESTS: usize = 4;

pub struct RemoteEmbeddingService {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl RemoteEmbeddingService {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            client: OpenAiClient::new(base_url, api_key),
            model: model.into(),
            dimensions,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        let batch = self.client.embed_batch(&self.model, chunk).await?;
        if batch.len() != chunk.len() {
            return Err(ScopeError::provider(format!(
                "Embedding endpoint returned {} vectors for {} texts",
                batch.len(),
                chunk.len()
            )));
        }
        Ok(batch)
    }
}

#[async_trait]
impl EmbeddingService for RemoteEmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScopeError::provider("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        let chunks: Vec<Vec<String>> = texts.chunks(self.batch_size).map(<[String]>::to_vec).collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks)
            .map(|chunk| async move { self.embed_chunk(&chunk).await })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn is_available(&self) -> bool {
        true
    }
}
