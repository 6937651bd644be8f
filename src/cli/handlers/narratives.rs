use std::path::Path;

use anyhow::Context;

use crate::cli::handlers::load;
use crate::cli::output::{output_json, print_header, print_hint, print_kv, OutputMode};
use crate::cli::progress::BarProgressReporter;
use crate::init::AppContext;
use crate::models::display_key;
use crate::services::{TextSource, TimeRange};

/// Optional trace applied before clustering.
pub struct TraceFirst<'a> {
    pub narrative: &'a str,
    pub start: &'a str,
    pub end: &'a str,
    pub threshold: Option<f32>,
}

pub async fn handle_narratives(
    ctx: &AppContext,
    corpus_path: &Path,
    num_narratives: Option<usize>,
    per_cluster: Option<usize>,
    trace_first: Option<TraceFirst<'_>>,
    out: Option<&Path>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let corpus = load(corpus_path)?;
    let pipeline_config = &ctx.config.pipeline;
    let num_narratives = num_narratives.unwrap_or(pipeline_config.num_narratives);
    let per_cluster = per_cluster.unwrap_or(pipeline_config.narratives_per_cluster);

    let source: Box<dyn TextSource> = match &trace_first {
        Some(tf) => {
            let range = TimeRange::parse(tf.start, tf.end)?;
            let threshold = tf.threshold.unwrap_or(pipeline_config.threshold);
            let trace = ctx
                .pipeline
                .trace(&corpus, tf.narrative, range, threshold)
                .await
                .context("Trace failed")?;
            if trace.is_empty() {
                anyhow::bail!(
                    "No posts matched '{}' in {} at threshold {}",
                    tf.narrative,
                    range,
                    threshold
                );
            }
            tracing::info!("Clustering {} traced posts", trace.len());
            Box::new(trace)
        }
        None => Box::new(corpus),
    };

    let progress = BarProgressReporter::new("Summarizing", mode == OutputMode::Human);
    let result = ctx
        .pipeline
        .generate_narratives(source.as_ref(), num_narratives, per_cluster, &progress)
        .await;
    progress.finish();
    let report = result.context("Narrative generation failed")?;

    if let Some(path) = out {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
    }

    match mode {
        OutputMode::Json => output_json(&report),
        OutputMode::Markdown => println!("{}", report.to_markdown()),
        OutputMode::Human => {
            print_header(&format!(
                "Narratives ({} clusters requested, {} populated)",
                report.requested_clusters,
                report.groups.len()
            ));
            print_kv("Model", ctx.generation_service.model_name());
            if report.candidate_count() == 0 {
                print_hint("The model returned no parseable narratives.");
            }
            for group in &report.groups {
                println!(
                    "\nCluster {} ({} posts)",
                    group.cluster_index, group.post_count
                );
                if group.candidates.is_empty() {
                    print_hint("  (no narratives)");
                }
                for candidate in &group.candidates {
                    for (key, value) in candidate.narratives() {
                        println!("  - {}: {}", display_key(key), value);
                    }
                }
            }
            if let Some(path) = out {
                print_hint(&format!("\nReport written to {}", path.display()));
            }
        }
    }

    Ok(())
}
