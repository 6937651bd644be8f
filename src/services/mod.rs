pub mod clustering;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod ranker;
pub mod similarity;
pub mod summarizer;
pub mod tracer;

pub use clustering::{assign_clusters, ClusterPartitioner, KMeansSettings};
pub use extract::extract_json_objects;
pub use pipeline::{NarrativePipeline, TextSource};
pub use progress::{noop_progress, LogProgressReporter, NoopProgressReporter, ProgressReporter};
pub use ranker::{RankedPost, ResultsRanker, ScoredCorpus};
pub use similarity::{SimilarityEngine, SimilarityMatrix};
pub use summarizer::{NarrativeSummarizer, SummarizerSettings};
pub use tracer::{
    FilteredTrace, SimilarityPoint, TemporalTracer, TimeRange, TraceSummary, TracedPost,
};
