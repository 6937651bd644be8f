//! Layered configuration.
//!
//! Priority: explicit `--config` file > `{data_path}/config.toml` >
//! `NARRASCOPE_CONFIG` env var (JSON) > defaults. An unreadable or invalid
//! data-path file or env value logs a warning and falls through; an explicit
//! file that cannot be loaded is an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::EmbeddingProviderConfig;
use crate::generation::GenerationProviderConfig;
use crate::ScopeError;

pub const CONFIG_ENV: &str = "NARRASCOPE_CONFIG";
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub embedding: EmbeddingProviderConfig,
    pub generation: GenerationProviderConfig,
    pub pipeline: PipelineConfig,
}

/// Tunables for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default similarity threshold for traces
    pub threshold: f32,
    /// Narratives requested from the model per cluster
    pub narratives_per_cluster: usize,
    /// Default cluster count for narrative generation
    pub num_narratives: usize,
    /// k-means RNG seed
    pub seed: u64,
    pub kmeans_max_iterations: u64,
    pub kmeans_tolerance: f64,
    /// Per-call timeout for embedding and generation requests
    pub timeout_secs: u64,
    pub embedding_batch_size: usize,
    /// Max texts held by the embedding cache
    pub embedding_cache_capacity: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            narratives_per_cluster: 2,
            num_narratives: 3,
            seed: 42,
            kmeans_max_iterations: 300,
            kmeans_tolerance: 1e-4,
            timeout_secs: 120,
            embedding_batch_size: 32,
            embedding_cache_capacity: 50_000,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl ScopeConfig {
    /// Reject values no operation can run with.
    pub fn validate(&self) -> Result<(), ScopeError> {
        let p = &self.pipeline;
        if !(-1.0..=1.0).contains(&p.threshold) {
            return Err(ScopeError::Config(format!(
                "pipeline.threshold must be within [-1, 1], got {}",
                p.threshold
            )));
        }
        if p.narratives_per_cluster == 0 || p.num_narratives == 0 {
            return Err(ScopeError::Config(
                "pipeline.narratives_per_cluster and pipeline.num_narratives must be at least 1"
                    .to_string(),
            ));
        }
        if p.timeout_secs == 0 || p.embedding_batch_size == 0 || p.kmeans_max_iterations == 0 {
            return Err(ScopeError::Config(
                "pipeline.timeout_secs, embedding_batch_size and kmeans_max_iterations must be positive"
                    .to_string(),
            ));
        }
        if !(p.kmeans_tolerance.is_finite() && p.kmeans_tolerance > 0.0) {
            return Err(ScopeError::Config(format!(
                "pipeline.kmeans_tolerance must be positive, got {}",
                p.kmeans_tolerance
            )));
        }
        Ok(())
    }
}

/// Parse a TOML config document.
pub fn parse_toml(contents: &str) -> Result<ScopeConfig, ScopeError> {
    toml::from_str(contents).map_err(|e| ScopeError::Config(e.to_string()))
}

/// Parse the JSON form accepted in `NARRASCOPE_CONFIG`.
pub fn parse_env_json(json: &str) -> Result<ScopeConfig, ScopeError> {
    serde_json::from_str(json).map_err(|e| ScopeError::Config(e.to_string()))
}

/// Load configuration following the documented priority.
pub fn load_config(explicit: Option<&Path>, data_path: &Path) -> Result<ScopeConfig, ScopeError> {
    let config = if let Some(path) = explicit {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = parse_toml(&contents).map_err(|e| {
            ScopeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!("Loaded config from {}", path.display());
        config
    } else {
        load_from_data_path(data_path)
            .or_else(load_from_env)
            .unwrap_or_default()
    };

    config.validate()?;
    Ok(config)
}

fn load_from_data_path(data_path: &Path) -> Option<ScopeConfig> {
    let config_path = data_path.join(CONFIG_FILE);
    if !config_path.exists() {
        return None;
    }
    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match parse_toml(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", config_path.display());
                Some(config)
            }
            Err(e) => {
                warn!(
                    "Failed to parse {}: {}. Using default.",
                    config_path.display(),
                    e
                );
                None
            }
        },
        Err(e) => {
            warn!(
                "Failed to read {}: {}. Using default.",
                config_path.display(),
                e
            );
            None
        }
    }
}

fn load_from_env() -> Option<ScopeConfig> {
    let json = std::env::var(CONFIG_ENV).ok()?;
    match parse_env_json(&json) {
        Ok(config) => {
            info!("Loaded config from {} env", CONFIG_ENV);
            Some(config)
        }
        Err(e) => {
            warn!("Failed to parse {}: {}. Using default.", CONFIG_ENV, e);
            None
        }
    }
}
