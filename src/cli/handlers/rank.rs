use std::path::Path;

use anyhow::Context;

use crate::cli::handlers::load;
use crate::cli::output::{
    format_score, output_json, print_header, print_kv, print_rows, truncate, OutputMode,
};
use crate::init::AppContext;

#[allow(clippy::too_many_arguments)]
pub async fn handle_rank(
    ctx: &AppContext,
    corpus_path: &Path,
    narratives: &[String],
    k: usize,
    narrative_index: usize,
    limit: Option<usize>,
    bottom: bool,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let corpus = load(corpus_path)?;
    let scored = ctx
        .pipeline
        .score(&corpus, narratives, limit)
        .await
        .context("Ranking failed")?;

    let column = scored.narrative_column(narrative_index);
    let ranked = if bottom {
        scored.bottom_k(k, column)
    } else {
        scored.top_k(k, column)
    };

    match mode {
        OutputMode::Json => output_json(&ranked),
        _ => {
            if mode == OutputMode::Human {
                let which = if bottom { "Least" } else { "Most" };
                print_header(&format!(
                    "{} similar posts to \"{}\"",
                    which, scored.narratives[column]
                ));
                print_kv("Scored", &format!("{} posts", scored.texts.len()));
                println!();
            }
            let rows = ranked
                .iter()
                .map(|r| {
                    vec![
                        r.index.to_string(),
                        format_score(r.similarity),
                        truncate(&r.text, 90),
                    ]
                })
                .collect();
            print_rows(mode, &["#", "Similarity", "Post"], rows);
        }
    }

    Ok(())
}

pub async fn handle_similarity(
    ctx: &AppContext,
    corpus_path: Option<&Path>,
    texts: &[String],
    narratives: &[String],
    limit: Option<usize>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let mut posts = texts.to_vec();
    if let Some(path) = corpus_path {
        posts.extend(load(path)?.texts());
    }
    if let Some(limit) = limit {
        posts.truncate(limit);
    }

    let matrix = ctx
        .pipeline
        .similarity(&posts, narratives)
        .await
        .context("Similarity failed")?;

    match mode {
        OutputMode::Json => output_json(&serde_json::json!({
            "posts": posts,
            "narratives": narratives,
            "matrix": matrix,
        })),
        _ => {
            let mut headers: Vec<&str> = vec!["Post"];
            headers.extend(narratives.iter().map(String::as_str));
            let rows = posts
                .iter()
                .zip(matrix.to_rows())
                .map(|(post, scores)| {
                    let mut row = vec![truncate(post, 60)];
                    row.extend(scores.into_iter().map(format_score));
                    row
                })
                .collect();
            print_rows(mode, &headers, rows);
        }
    }

    Ok(())
}
