//! Cluster summarization: one generation call per cluster, parsed into
//! structured narrative candidates.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::generation::{GenerationRequest, GenerationService};
use crate::models::NarrativeCandidate;
use crate::services::extract::extract_json_objects;
use crate::services::progress::ProgressReporter;
use crate::ScopeError;

/// Sampling and deadline applied to every summarization call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummarizerSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            max_tokens: 512,
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct NarrativeSummarizer {
    generation: Arc<dyn GenerationService>,
    settings: SummarizerSettings,
}

impl NarrativeSummarizer {
    pub fn new(generation: Arc<dyn GenerationService>, settings: SummarizerSettings) -> Self {
        Self {
            generation,
            settings,
        }
    }

    /// The prompt sent for one cluster.
    pub fn build_request(&self, posts: &[String], max_narratives: usize) -> GenerationRequest {
        GenerationRequest::new(system_prompt(max_narratives), user_prompt(posts))
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    /// Candidates for each cluster, in cluster order.
    ///
    /// Empty clusters are never sent to the model. A failed or timed-out
    /// generation leaves an empty list at that cluster's position.
    pub async fn summarize(
        &self,
        clusters: &[Vec<String>],
        max_per_cluster: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<Vec<NarrativeCandidate>>, ScopeError> {
        if max_per_cluster == 0 {
            return Err(ScopeError::InvalidInput(
                "Narratives per cluster must be at least 1".to_string(),
            ));
        }

        let total = clusters.len();
        let mut results = Vec::with_capacity(total);
        for (i, cluster) in clusters.iter().enumerate() {
            let candidates = if cluster.is_empty() {
                debug!(cluster = i, "skipping empty cluster");
                vec![]
            } else {
                self.summarize_cluster(i, cluster, max_per_cluster).await
            };
            progress
                .step(
                    i + 1,
                    total,
                    &format!("Summarized cluster {}/{}", i + 1, total),
                )
                .await;
            results.push(candidates);
        }

        info!(
            "Generated {} narrative candidates from {} clusters",
            results.iter().map(Vec::len).sum::<usize>(),
            total
        );
        Ok(results)
    }

    async fn summarize_cluster(
        &self,
        index: usize,
        posts: &[String],
        max_narratives: usize,
    ) -> Vec<NarrativeCandidate> {
        let request = self.build_request(posts, max_narratives);
        let response =
            match tokio::time::timeout(self.settings.timeout, self.generation.generate(&request))
                .await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(cluster = index, "Generation failed: {}", e);
                    return vec![];
                }
                Err(_) => {
                    warn!(
                        cluster = index,
                        "Generation timed out after {:?}", self.settings.timeout
                    );
                    return vec![];
                }
            };

        let candidates: Vec<NarrativeCandidate> = extract_json_objects(&response)
            .into_iter()
            .filter_map(NarrativeCandidate::from_json)
            .collect();
        if candidates.is_empty() {
            warn!(
                cluster = index,
                "No narratives could be parsed from model response"
            );
        }
        candidates
    }
}

fn system_prompt(max_narratives: usize) -> String {
    let keys: Vec<String> = (1..=max_narratives)
        .map(|i| format!("\"narrative_{}\": \"...\"", i))
        .collect();
    format!(
        "You should find the top {n} dominant narratives in the following batch of posts. \
         Do not cite which posts correspond to the narratives, just supply the narrative summaries. \
         You must always return valid JSON fenced by a markdown code block. \
         Do not return any additional text.\n\
         The output must be a single JSON object whose keys are narrative_1 through narrative_{n} \
         and whose values are one-sentence narrative summaries:\n\
         ```json\n{{{keys}}}\n```",
        n = max_narratives,
        keys = keys.join(", ")
    )
}

fn user_prompt(posts: &[String]) -> String {
    let mut prompt = String::from("Posts:\n");
    for post in posts {
        prompt.push_str("- ");
        prompt.push_str(&post.replace('\n', " "));
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::NoopProgressReporter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationService for EchoGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ScopeError> {
            self.prompts.lock().unwrap().push(request.user.clone());
            if request.user.contains("fail") {
                return Err(ScopeError::provider("model crashed"));
            }
            Ok(r#"```json
{"narrative_1": "A", "narrative_2": "B"}
```"#
                .to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_system_prompt_names_every_key() {
        let prompt = system_prompt(3);
        assert!(prompt.contains("top 3 dominant narratives"));
        assert!(prompt.contains("\"narrative_3\""));
        assert!(!prompt.contains("narrative_4"));
        assert!(prompt.contains("Do not cite"));
    }

    #[test]
    fn test_user_prompt_flattens_newlines() {
        let prompt = user_prompt(&["line one\nline two".to_string(), "other".to_string()]);
        assert_eq!(prompt, "Posts:\n- line one line two\n- other\n");
    }

    #[tokio::test]
    async fn test_failures_and_empty_clusters_keep_position() {
        let generator = Arc::new(EchoGenerator {
            prompts: Mutex::new(vec![]),
        });
        let summarizer = NarrativeSummarizer::new(generator.clone(), SummarizerSettings::default());
        let clusters = vec![
            vec!["ok post".to_string()],
            vec![],
            vec!["please fail".to_string()],
        ];
        let results = summarizer
            .summarize(&clusters, 2, &NoopProgressReporter)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[0][0].get("narrative_2"), Some("B"));
        assert!(results[1].is_empty());
        assert!(results[2].is_empty());
        assert_eq!(generator.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_narratives_rejected() {
        let summarizer = NarrativeSummarizer::new(
            Arc::new(EchoGenerator {
                prompts: Mutex::new(vec![]),
            }),
            SummarizerSettings::default(),
        );
        let err = summarizer
            .summarize(&[vec!["x".to_string()]], 0, &NoopProgressReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, ScopeError::InvalidInput(_)));
    }
}
