use std::path::Path;

use anyhow::Context;

use crate::cli::handlers::load;
use crate::cli::output::{
    format_score, output_json, print_header, print_hint, print_kv, print_rows, truncate,
    OutputMode,
};
use crate::init::AppContext;
use crate::services::TimeRange;

#[allow(clippy::too_many_arguments)]
pub async fn handle_trace(
    ctx: &AppContext,
    corpus_path: &Path,
    narrative: &str,
    start: &str,
    end: &str,
    threshold: Option<f32>,
    out: Option<&Path>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let corpus = load(corpus_path)?;
    let range = TimeRange::parse(start, end)?;
    let threshold = threshold.unwrap_or(ctx.config.pipeline.threshold);

    let trace = ctx
        .pipeline
        .trace(&corpus, narrative, range, threshold)
        .await
        .context("Trace failed")?;

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&trace)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
    }

    match mode {
        OutputMode::Json => output_json(&trace),
        OutputMode::Human | OutputMode::Markdown => {
            if mode == OutputMode::Human {
                print_header(&format!("Trace: \"{}\"", narrative));
                print_kv("Window", &range.to_string());
                print_kv("Threshold", &format!("{:.2}", threshold));
                print_kv(
                    "Matched",
                    &format!("{} of {} posts", trace.len(), corpus.len()),
                );
                println!();
            }
            let rows: Vec<Vec<String>> = trace
                .records
                .iter()
                .map(|r| {
                    vec![
                        r.index.to_string(),
                        r.post
                            .timestamp
                            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                        format_score(r.similarity),
                        truncate(&r.post.text, 80),
                    ]
                })
                .collect();
            print_rows(mode, &["#", "Time", "Similarity", "Post"], rows);
            if let Some(path) = out {
                print_hint(&format!("Trace written to {}", path.display()));
            }
        }
    }

    Ok(())
}

pub async fn handle_timeseries(
    ctx: &AppContext,
    corpus_path: &Path,
    narrative: &str,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let corpus = load(corpus_path)?;
    let points = ctx
        .pipeline
        .timeseries(&corpus, narrative)
        .await
        .context("Time series failed")?;

    match mode {
        OutputMode::Json => output_json(&points),
        _ => {
            if mode == OutputMode::Human {
                print_header(&format!("Similarity over time: \"{}\"", narrative));
            }
            let rows = points
                .iter()
                .map(|p| {
                    vec![
                        p.timestamp.to_rfc3339(),
                        format_score(p.similarity),
                    ]
                })
                .collect();
            print_rows(mode, &["Time", "Similarity"], rows);
        }
    }
    Ok(())
}
