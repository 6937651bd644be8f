//! Text-keyed memoization over any [`EmbeddingService`].
//!
//! Repeated runs over the same corpus (tracing several narratives, ranking
//! after generation) re-embed identical posts; the cache turns those into
//! lookups. Embeddings are deterministic per model, so entries never go stale
//! within a process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use crate::embedding::EmbeddingService;
use crate::ScopeError;

pub struct CachedEmbeddingService {
    inner: Arc<dyn EmbeddingService>,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbeddingService {
    pub fn new(inner: Arc<dyn EmbeddingService>, max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { inner, cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl EmbeddingService for CachedEmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ScopeError> {
        if let Some(hit) = self.cache.get(text).await {
            return Ok(hit.as_ref().clone());
        }
        let embedding = self.inner.embed_text(text).await?;
        self.cache
            .insert(text.to_string(), Arc::new(embedding.clone()))
            .await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScopeError> {
        let mut found: HashMap<&str, Arc<Vec<f32>>> = HashMap::new();
        let mut pending: HashSet<&str> = HashSet::new();
        let mut misses: Vec<&str> = Vec::new();
        for text in texts {
            let text = text.as_str();
            if found.contains_key(text) || pending.contains(text) {
                continue;
            }
            match self.cache.get(text).await {
                Some(hit) => {
                    found.insert(text, hit);
                }
                None => {
                    pending.insert(text);
                    misses.push(text);
                }
            }
        }

        debug!(
            total = texts.len(),
            misses = misses.len(),
            "embedding cache lookup"
        );

        if !misses.is_empty() {
            let request: Vec<String> = misses.iter().map(|t| t.to_string()).collect();
            let fresh = self.inner.embed_batch(&request).await?;
            if fresh.len() != misses.len() {
                return Err(ScopeError::provider(format!(
                    "Embedding backend returned {} vectors for {} texts",
                    fresh.len(),
                    misses.len()
                )));
            }
            for (text, embedding) in misses.into_iter().zip(fresh) {
                let embedding = Arc::new(embedding);
                self.cache.insert(text.to_string(), embedding.clone()).await;
                found.insert(text, embedding);
            }
        }

        texts
            .iter()
            .map(|text| {
                found
                    .get(text.as_str())
                    .map(|e| e.as_ref().clone())
                    .ok_or_else(|| ScopeError::provider("Embedding missing after cache fill"))
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
