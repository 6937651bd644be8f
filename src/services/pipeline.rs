//! Facade wiring the similarity, tracing, clustering, summarization and
//! ranking services over one pair of shared providers.

use std::sync::Arc;

use tracing::info;

use crate::config::PipelineConfig;
use crate::embedding::EmbeddingService;
use crate::generation::GenerationService;
use crate::models::{Corpus, NarrativeGroup, NarrativeReport};
use crate::services::clustering::{ClusterPartitioner, KMeansSettings};
use crate::services::progress::ProgressReporter;
use crate::services::ranker::{RankedPost, ResultsRanker, ScoredCorpus};
use crate::services::similarity::{SimilarityEngine, SimilarityMatrix};
use crate::services::summarizer::{NarrativeSummarizer, SummarizerSettings};
use crate::services::tracer::{FilteredTrace, SimilarityPoint, TemporalTracer, TimeRange};
use crate::ScopeError;

/// Anything narratives can be generated from.
pub trait TextSource {
    fn source_texts(&self) -> Vec<String>;
}

impl TextSource for Corpus {
    fn source_texts(&self) -> Vec<String> {
        self.texts()
    }
}

impl TextSource for FilteredTrace {
    fn source_texts(&self) -> Vec<String> {
        self.texts()
    }
}

impl TextSource for [String] {
    fn source_texts(&self) -> Vec<String> {
        self.to_vec()
    }
}

pub struct NarrativePipeline {
    engine: Arc<SimilarityEngine>,
    generation: Arc<dyn GenerationService>,
    tracer: TemporalTracer,
    partitioner: ClusterPartitioner,
    summarizer: NarrativeSummarizer,
    ranker: ResultsRanker,
}

impl NarrativePipeline {
    /// `sampling` is the generation `(temperature, max_tokens)` pair.
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        generation: Arc<dyn GenerationService>,
        config: &PipelineConfig,
        sampling: (f32, u32),
    ) -> Self {
        let timeout = config.timeout();
        let chunk_size = config.embedding_batch_size;
        let engine = Arc::new(
            SimilarityEngine::new(embedding.clone(), timeout).with_chunk_size(chunk_size),
        );
        let settings = KMeansSettings {
            seed: config.seed,
            max_iterations: config.kmeans_max_iterations,
            tolerance: config.kmeans_tolerance,
        };
        let (temperature, max_tokens) = sampling;

        Self {
            tracer: TemporalTracer::new(engine.clone()),
            partitioner: ClusterPartitioner::new(embedding, timeout, settings)
                .with_chunk_size(chunk_size),
            summarizer: NarrativeSummarizer::new(
                generation.clone(),
                SummarizerSettings {
                    temperature,
                    max_tokens,
                    timeout,
                },
            ),
            ranker: ResultsRanker::new(engine.clone()),
            engine,
            generation,
        }
    }

    pub async fn trace(
        &self,
        corpus: &Corpus,
        narrative: &str,
        range: TimeRange,
        threshold: f32,
    ) -> Result<FilteredTrace, ScopeError> {
        self.tracer.trace(corpus, narrative, range, threshold).await
    }

    /// Cluster `source` into `num_narratives` groups and summarize each.
    ///
    /// Only populated clusters appear in the report.
    pub async fn generate_narratives(
        &self,
        source: &(impl TextSource + ?Sized),
        num_narratives: usize,
        per_cluster: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<NarrativeReport, ScopeError> {
        if !self.generation.is_available() {
            return Err(ScopeError::provider(format!(
                "Generation model '{}' is not available",
                self.generation.model_name()
            )));
        }

        let texts = source.source_texts();
        let groups = self
            .partitioner
            .partition_indices(&texts, num_narratives)
            .await?;
        let clusters: Vec<Vec<String>> = groups
            .iter()
            .map(|g| g.iter().map(|&i| texts[i].clone()).collect())
            .collect();

        let candidates = self
            .summarizer
            .summarize(&clusters, per_cluster, progress)
            .await?;

        let groups: Vec<NarrativeGroup> = clusters
            .iter()
            .zip(candidates)
            .enumerate()
            .filter(|(_, (cluster, _))| !cluster.is_empty())
            .map(|(cluster_index, (cluster, candidates))| NarrativeGroup {
                cluster_index,
                post_count: cluster.len(),
                candidates,
            })
            .collect();

        let report = NarrativeReport {
            requested_clusters: num_narratives,
            groups,
        };
        info!(
            "Narrative report: {} candidates across {} populated clusters",
            report.candidate_count(),
            report.groups.len()
        );
        Ok(report)
    }

    pub async fn rank_top_k(
        &self,
        corpus: &Corpus,
        narratives: &[String],
        k: usize,
        narrative_index: usize,
    ) -> Result<Vec<RankedPost>, ScopeError> {
        self.ranker.rank(corpus, narratives, k, narrative_index).await
    }

    pub async fn score(
        &self,
        corpus: &Corpus,
        narratives: &[String],
        limit: Option<usize>,
    ) -> Result<ScoredCorpus, ScopeError> {
        self.ranker.score(corpus, narratives, limit).await
    }

    pub async fn similarity(
        &self,
        posts: &[String],
        narratives: &[String],
    ) -> Result<SimilarityMatrix, ScopeError> {
        self.engine.compute(posts, narratives).await
    }

    pub async fn partition(
        &self,
        texts: &[String],
        k: usize,
    ) -> Result<Vec<Vec<String>>, ScopeError> {
        self.partitioner.partition(texts, k).await
    }

    pub async fn partition_indices(
        &self,
        texts: &[String],
        k: usize,
    ) -> Result<Vec<Vec<usize>>, ScopeError> {
        self.partitioner.partition_indices(texts, k).await
    }

    pub async fn timeseries(
        &self,
        corpus: &Corpus,
        narrative: &str,
    ) -> Result<Vec<SimilarityPoint>, ScopeError> {
        self.tracer.timeseries(corpus, narrative).await
    }
}
