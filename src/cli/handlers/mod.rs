//! CLI command handlers.

pub mod narratives;
pub mod partition;
pub mod rank;
pub mod trace;

use std::path::Path;

use anyhow::Context;

use crate::corpus::load_corpus;
use crate::models::Corpus;

pub(crate) fn load(path: &Path) -> anyhow::Result<Corpus> {
    let corpus = load_corpus(path)
        .with_context(|| format!("Failed to load corpus '{}'", path.display()))?;
    if corpus.is_empty() {
        anyhow::bail!("Corpus '{}' contains no posts with text", path.display());
    }
    Ok(corpus)
}
