//! Embedding provider configuration and factory.
//!
//! Supports multiple embedding backends via a tagged enum configuration.
//! Default is a local candle encoder (all-MiniLM-L6-v2). Any OpenAI-compatible
//! `/embeddings` endpoint can be used instead.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::model::DEFAULT_LOCAL_MODEL;
use crate::embedding::{
    EmbeddingConfig, EmbeddingService, LocalEmbeddingService, RemoteEmbeddingService,
};
use crate::ScopeError;

/// Embedding provider configuration.
///
/// Lives under the `[embedding]` table of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum EmbeddingProviderConfig {
    /// Local candle BERT encoder (default).
    Local {
        /// HuggingFace repository id
        #[serde(default = "default_local_model")]
        model: String,
        /// Cache directory for model files
        #[serde(default)]
        cache_dir: Option<PathBuf>,
    },
    /// OpenAI-compatible embeddings endpoint.
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default = "default_openai_model")]
        model: String,
        /// Name of the env var holding the API key; unset means no auth header.
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default = "default_openai_dimensions")]
        dimensions: usize,
    },
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_openai_dimensions() -> usize {
    1536
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self::Local {
            model: default_local_model(),
            cache_dir: None,
        }
    }
}

impl EmbeddingProviderConfig {
    /// Short human label, e.g. `local:sentence-transformers/all-MiniLM-L6-v2`.
    pub fn label(&self) -> String {
        match self {
            Self::Local { model, .. } => format!("local:{}", model),
            Self::OpenAi { model, .. } => format!("openai:{}", model),
        }
    }
}

/// Create an embedding service from provider configuration.
pub fn create_embedding_service(
    config: &EmbeddingProviderConfig,
    batch_size: usize,
) -> Result<Arc<dyn EmbeddingService>, ScopeError> {
    match config {
        EmbeddingProviderConfig::Local { model, cache_dir } => {
            if model.trim().is_empty() {
                return Err(ScopeError::Config(
                    "Local embedding model must name a HuggingFace repository".to_string(),
                ));
            }
            let service = LocalEmbeddingService::new(EmbeddingConfig {
                model_repo: model.clone(),
                cache_dir: cache_dir.clone(),
                batch_size,
            });
            Ok(Arc::new(service))
        }
        EmbeddingProviderConfig::OpenAi {
            base_url,
            model,
            api_key_env,
            dimensions,
        } => {
            let api_key = resolve_api_key(api_key_env.as_deref())?;
            info!("Using remote embeddings ({} at {})", model, base_url);
            Ok(Arc::new(RemoteEmbeddingService::new(
                base_url,
                api_key,
                model.clone(),
                *dimensions,
                batch_size,
            )))
        }
    }
}

/// Read the API key from the named env var. A named but unset var is a
/// configuration error; no name means the endpoint needs no key.
pub(crate) fn resolve_api_key(env_name: Option<&str>) -> Result<Option<String>, ScopeError> {
    match env_name {
        None => Ok(None),
        Some(name) => std::env::var(name).map(Some).map_err(|_| {
            ScopeError::Config(format!("API key env var '{}' is not set", name))
        }),
    }
}
