//! Ranking a corpus against a list of narratives.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::models::Corpus;
use crate::services::similarity::{SimilarityEngine, SimilarityMatrix};
use crate::ScopeError;

/// A post's text with its similarity to one narrative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPost {
    pub index: usize,
    pub text: String,
    pub similarity: f32,
}

/// A scored slice of a corpus: the posts that were scored plus their full
/// similarity matrix.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCorpus {
    pub texts: Vec<String>,
    pub narratives: Vec<String>,
    pub matrix: SimilarityMatrix,
}

impl ScoredCorpus {
    /// Resolve a narrative column, falling back to 0 when out of range.
    pub fn narrative_column(&self, narrative_index: usize) -> usize {
        if narrative_index < self.narratives.len() {
            narrative_index
        } else {
            warn!(
                "Narrative index {} out of range (have {}), using 0",
                narrative_index,
                self.narratives.len()
            );
            0
        }
    }

    /// All scored posts ordered by ascending similarity to one narrative.
    /// Ties keep corpus order.
    pub fn sort_by_narrative(&self, narrative_index: usize) -> Vec<RankedPost> {
        let column = self.narrative_column(narrative_index);
        let scores = self.matrix.column(column).unwrap_or_default();
        let mut ranked: Vec<RankedPost> = self
            .texts
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(index, (text, similarity))| RankedPost {
                index,
                text: text.clone(),
                similarity,
            })
            .collect();
        ranked.sort_by(|a, b| a.similarity.total_cmp(&b.similarity));
        ranked
    }

    /// The `k` most similar posts, in ascending order (the last is the best).
    pub fn top_k(&self, k: usize, narrative_index: usize) -> Vec<RankedPost> {
        let mut ranked = self.sort_by_narrative(narrative_index);
        let k = k.min(ranked.len());
        ranked.split_off(ranked.len() - k)
    }

    /// The `k` least similar posts, in ascending order.
    pub fn bottom_k(&self, k: usize, narrative_index: usize) -> Vec<RankedPost> {
        let mut ranked = self.sort_by_narrative(narrative_index);
        ranked.truncate(k);
        ranked
    }
}

pub struct ResultsRanker {
    engine: Arc<SimilarityEngine>,
}

impl ResultsRanker {
    pub fn new(engine: Arc<SimilarityEngine>) -> Self {
        Self { engine }
    }

    /// Score the corpus (or its first `limit` posts) against every narrative.
    pub async fn score(
        &self,
        corpus: &Corpus,
        narratives: &[String],
        limit: Option<usize>,
    ) -> Result<ScoredCorpus, ScopeError> {
        let mut texts = corpus.texts();
        if let Some(limit) = limit {
            if limit > texts.len() {
                warn!(
                    "Limit {} exceeds corpus size {}, scoring all posts",
                    limit,
                    texts.len()
                );
            }
            texts.truncate(limit);
        }

        let matrix = self.engine.compute(&texts, narratives).await?;
        Ok(ScoredCorpus {
            texts,
            narratives: narratives.to_vec(),
            matrix,
        })
    }

    /// The `k` posts most similar to `narratives[narrative_index]`,
    /// ascending by similarity.
    pub async fn rank(
        &self,
        corpus: &Corpus,
        narratives: &[String],
        k: usize,
        narrative_index: usize,
    ) -> Result<Vec<RankedPost>, ScopeError> {
        let scored = self.score(corpus, narratives, None).await?;
        Ok(scored.top_k(k, narrative_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scored(texts: &[&str], scores: &[[f32; 1]]) -> ScoredCorpus {
        let rows: Vec<Vec<f32>> = scores.iter().map(|r| r.to_vec()).collect();
        ScoredCorpus {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            narratives: vec!["n".to_string()],
            matrix: SimilarityMatrix::from_rows(&rows),
        }
    }

    #[test]
    fn test_top_k_ascending_with_best_last() {
        let s = scored(&["a", "b", "c", "d"], &[[0.2], [0.9], [-0.1], [0.5]]);
        let top: Vec<String> = s.top_k(2, 0).into_iter().map(|r| r.text).collect();
        assert_eq!(top, vec!["d", "b"]);
        let bottom: Vec<String> = s.bottom_k(2, 0).into_iter().map(|r| r.text).collect();
        assert_eq!(bottom, vec!["c", "a"]);
    }

    #[test]
    fn test_k_clamped_and_index_fallback() {
        let s = scored(&["a", "b"], &[[0.3], [0.1]]);
        let all = s.top_k(10, 5);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].index, 0);
        assert_eq!(s.top_k(0, 0), vec![]);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let s = scored(&["a", "b", "c"], &[[0.5], [0.5], [0.5]]);
        let order: Vec<usize> = s.sort_by_narrative(0).iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
