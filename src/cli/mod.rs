//! CLI interface for narrascope.

pub mod handlers;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use output::OutputMode;

/// narrascope - trace narratives through social-media corpora and discover
/// the dominant ones
#[derive(Parser)]
#[command(name = "narrascope", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.narrascope)
    #[arg(long, env = "NARRASCOPE_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Configuration file (default: {data_path}/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    /// Output as Markdown
    #[arg(long, global = true)]
    pub md: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Posts in a time window that resemble a narrative, oldest first
    Trace {
        /// Corpus file (.csv, .json, .jsonl, .txt)
        corpus: PathBuf,
        /// Target narrative
        #[arg(long, short)]
        narrative: String,
        /// Window start (date or timestamp)
        #[arg(long)]
        start: String,
        /// Window end, inclusive (a bare date covers the whole day)
        #[arg(long)]
        end: String,
        /// Minimum similarity (default from config, 0.5)
        #[arg(long)]
        threshold: Option<f32>,
        /// Also write the trace as JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Cluster posts and summarize each cluster into candidate narratives
    Narratives {
        /// Corpus file (.csv, .json, .jsonl, .txt)
        corpus: PathBuf,
        /// Number of clusters (default from config, 3)
        #[arg(long, short = 'k')]
        num_narratives: Option<usize>,
        /// Narratives requested per cluster (default from config, 2)
        #[arg(long)]
        per_cluster: Option<usize>,
        /// Trace this narrative first and cluster only the traced posts
        #[arg(long, requires_all = ["start", "end"])]
        narrative: Option<String>,
        /// Trace window start
        #[arg(long, requires = "narrative")]
        start: Option<String>,
        /// Trace window end
        #[arg(long, requires = "narrative")]
        end: Option<String>,
        /// Trace threshold
        #[arg(long, requires = "narrative")]
        threshold: Option<f32>,
        /// Also write the report as JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Posts most similar to one of several narratives
    Rank {
        /// Corpus file (.csv, .json, .jsonl, .txt)
        corpus: PathBuf,
        /// Narratives to score against (repeatable)
        #[arg(long = "narrative", short, required = true)]
        narratives: Vec<String>,
        /// Number of posts to return
        #[arg(long, short, default_value = "10")]
        k: usize,
        /// Which narrative to rank by (0-based)
        #[arg(long, default_value = "0")]
        index: usize,
        /// Only score the first N posts
        #[arg(long)]
        limit: Option<usize>,
        /// Show the least similar posts instead
        #[arg(long)]
        bottom: bool,
    },

    /// Full post x narrative similarity matrix
    Similarity {
        /// Corpus file; omit to score --text values instead
        #[arg(long, required_unless_present = "texts")]
        corpus: Option<PathBuf>,
        /// Inline post text (repeatable)
        #[arg(long = "text")]
        texts: Vec<String>,
        /// Narratives (repeatable)
        #[arg(long = "narrative", short, required = true)]
        narratives: Vec<String>,
        /// Only score the first N posts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Split posts into k clusters by embedding similarity
    Partition {
        /// Corpus file (.csv, .json, .jsonl, .txt)
        corpus: PathBuf,
        /// Number of clusters
        #[arg(long, short)]
        k: usize,
        /// Posts shown per cluster in human output
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Similarity of every dated post to a narrative over time
    Timeseries {
        /// Corpus file (.csv, .json, .jsonl)
        corpus: PathBuf,
        /// Target narrative
        #[arg(long, short)]
        narrative: String,
    },
}

/// Execute a CLI command.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Trace {
            corpus,
            narrative,
            start,
            end,
            threshold,
            out,
        } => {
            handlers::trace::handle_trace(
                ctx,
                corpus,
                narrative,
                start,
                end,
                *threshold,
                out.as_deref(),
                mode,
            )
            .await?
        }

        Commands::Narratives {
            corpus,
            num_narratives,
            per_cluster,
            narrative,
            start,
            end,
            threshold,
            out,
        } => {
            let prefilter = match (narrative, start, end) {
                (Some(narrative), Some(start), Some(end)) => Some(handlers::narratives::TraceFirst {
                    narrative,
                    start,
                    end,
                    threshold: *threshold,
                }),
                _ => None,
            };
            handlers::narratives::handle_narratives(
                ctx,
                corpus,
                *num_narratives,
                *per_cluster,
                prefilter,
                out.as_deref(),
                mode,
            )
            .await?
        }

        Commands::Rank {
            corpus,
            narratives,
            k,
            index,
            limit,
            bottom,
        } => {
            handlers::rank::handle_rank(
                ctx, corpus, narratives, *k, *index, *limit, *bottom, mode,
            )
            .await?
        }

        Commands::Similarity {
            corpus,
            texts,
            narratives,
            limit,
        } => {
            handlers::rank::handle_similarity(
                ctx,
                corpus.as_deref(),
                texts,
                narratives,
                *limit,
                mode,
            )
            .await?
        }

        Commands::Partition { corpus, k, preview } => {
            handlers::partition::handle_partition(ctx, corpus, *k, *preview, mode).await?
        }

        Commands::Timeseries { corpus, narrative } => {
            handlers::trace::handle_timeseries(ctx, corpus, narrative, mode).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rank_with_repeated_narratives() {
        let cli = Cli::try_parse_from([
            "narrascope",
            "rank",
            "tweets.csv",
            "-n",
            "taxes are theft",
            "-n",
            "the moon landing was staged",
            "--index",
            "1",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Rank {
                narratives, index, k, ..
            } => {
                assert_eq!(narratives.len(), 2);
                assert_eq!(index, 1);
                assert_eq!(k, 10);
            }
            _ => panic!("expected rank"),
        }
    }

    #[test]
    fn test_narratives_trace_flags_travel_together() {
        assert!(Cli::try_parse_from([
            "narrascope",
            "narratives",
            "tweets.csv",
            "--narrative",
            "x",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "narrascope",
            "narratives",
            "tweets.csv",
            "--narrative",
            "x",
            "--start",
            "2024-01-01",
            "--end",
            "2024-02-01",
        ])
        .is_ok());
    }

    #[test]
    fn test_similarity_needs_corpus_or_text() {
        assert!(Cli::try_parse_from(["narrascope", "similarity", "-n", "x"]).is_err());
        assert!(
            Cli::try_parse_from(["narrascope", "similarity", "--text", "a", "-n", "x"]).is_ok()
        );
    }
}
