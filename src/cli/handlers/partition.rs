use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::cli::handlers::load;
use crate::cli::output::{output_json, print_header, print_hint, print_rows, truncate, OutputMode};
use crate::init::AppContext;

#[derive(Serialize)]
struct ClusterOutput {
    cluster: usize,
    size: usize,
    posts: Vec<ClusterPost>,
}

#[derive(Serialize)]
struct ClusterPost {
    index: usize,
    text: String,
}

pub async fn handle_partition(
    ctx: &AppContext,
    corpus_path: &Path,
    k: usize,
    preview: usize,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let corpus = load(corpus_path)?;
    let texts = corpus.texts();
    let groups = ctx
        .pipeline
        .partition_indices(&texts, k)
        .await
        .context("Partition failed")?;

    let clusters: Vec<ClusterOutput> = groups
        .into_iter()
        .enumerate()
        .map(|(cluster, indices)| ClusterOutput {
            cluster,
            size: indices.len(),
            posts: indices
                .into_iter()
                .map(|index| ClusterPost {
                    index,
                    text: texts[index].clone(),
                })
                .collect(),
        })
        .collect();

    match mode {
        OutputMode::Json => output_json(&clusters),
        _ => {
            if mode == OutputMode::Human {
                print_header(&format!("{} posts in {} clusters", texts.len(), k));
            }
            let rows = clusters
                .iter()
                .flat_map(|c| {
                    c.posts.iter().take(preview).map(move |p| {
                        vec![
                            c.cluster.to_string(),
                            c.size.to_string(),
                            p.index.to_string(),
                            truncate(&p.text, 80),
                        ]
                    })
                })
                .collect();
            print_rows(mode, &["Cluster", "Size", "#", "Post"], rows);
            let empty = clusters.iter().filter(|c| c.size == 0).count();
            if empty > 0 && mode == OutputMode::Human {
                print_hint(&format!(
                    "{} clusters are empty (fewer distinct posts than clusters)",
                    empty
                ));
            }
        }
    }

    Ok(())
}
