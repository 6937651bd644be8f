#![allow(dead_code)]

pub mod builders;
pub mod stubs;

use std::sync::Arc;

use narrascope::config::PipelineConfig;
use narrascope::embedding::EmbeddingService;
use narrascope::generation::GenerationService;
use narrascope::services::NarrativePipeline;

// Re-export commonly used test utilities
pub use builders::{day, strings, CorpusBuilder};
pub use stubs::{FixedEmbedder, HashingEmbedder, ScriptedGenerator};

/// Pipeline over the given stubs with default configuration.
pub fn test_pipeline(
    embedding: Arc<dyn EmbeddingService>,
    generation: Arc<dyn GenerationService>,
) -> NarrativePipeline {
    NarrativePipeline::new(embedding, generation, &PipelineConfig::default(), (0.9, 512))
}

/// Pipeline with a custom per-call timeout.
pub fn test_pipeline_with_timeout(
    embedding: Arc<dyn EmbeddingService>,
    generation: Arc<dyn GenerationService>,
    timeout_secs: u64,
) -> NarrativePipeline {
    let config = PipelineConfig {
        timeout_secs,
        ..PipelineConfig::default()
    };
    NarrativePipeline::new(embedding, generation, &config, (0.9, 512))
}
