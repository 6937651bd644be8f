//! Process-level wiring: data path, configuration and shared providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{load_config, ScopeConfig};
use crate::embedding::{create_embedding_service, CachedEmbeddingService, EmbeddingService};
use crate::generation::{create_generation_service, GenerationService};
use crate::services::NarrativePipeline;

pub const DATA_PATH_ENV: &str = "NARRASCOPE_DATA_PATH";

/// Application context holding configuration and the shared providers.
///
/// Providers are created once and shared read-only by every operation.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: ScopeConfig,
    pub embedding_service: Arc<dyn EmbeddingService>,
    pub generation_service: Arc<dyn GenerationService>,
    pub pipeline: NarrativePipeline,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > NARRASCOPE_DATA_PATH env > ./.narrascope (if exists) > ~/.narrascope
    pub async fn new(explicit_path: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config =
            load_config(config_path, &data_path).context("Failed to load configuration")?;

        tracing::info!(
            "Initializing embedding provider ({})...",
            config.embedding.label()
        );
        let backend = create_embedding_service(
            &config.embedding,
            config.pipeline.embedding_batch_size,
        )
        .context("Failed to create embedding provider")?;

        if backend.is_available() {
            tracing::info!(
                "Embedding provider ready ({} dimensions)",
                backend.dimensions()
            );
        } else {
            tracing::warn!("Embedding provider not available");
        }

        let embedding_service: Arc<dyn EmbeddingService> = Arc::new(CachedEmbeddingService::new(
            backend,
            config.pipeline.embedding_cache_capacity,
        ));

        let generation_service = create_generation_service(&config.generation)
            .context("Failed to create generation provider")?;

        let pipeline = NarrativePipeline::new(
            embedding_service.clone(),
            generation_service.clone(),
            &config.pipeline,
            config.generation.sampling(),
        );

        Ok(Self {
            data_path,
            config,
            embedding_service,
            generation_service,
            pipeline,
        })
    }
}

pub fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var(DATA_PATH_ENV).ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(".narrascope");
            if local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".narrascope"))
                .unwrap_or_else(|| PathBuf::from(".narrascope"))
        })
}
