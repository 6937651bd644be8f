//! Cluster summarization into narrative candidates.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::stubs::{FixedEmbedder, HashingEmbedder, Script};
use common::{day, strings, test_pipeline, CorpusBuilder, ScriptedGenerator};
use narrascope::generation::NoopGenerationService;
use narrascope::services::{NoopProgressReporter, ProgressReporter, TimeRange};
use narrascope::ScopeError;
use pretty_assertions::assert_eq;

const NOISY_RESPONSE: &str = "Sure! Here is what I found:\n```json\n\
{\"narrative_1\": \"Taxes are too high\", \"narrative_2\": \"Refunds are late\"}\n```\n\
Let me know if you need {more detail}.";

struct RecordingProgress {
    steps: Mutex<Vec<f64>>,
}

#[async_trait]
impl ProgressReporter for RecordingProgress {
    async fn report(&self, current: f64, _total: f64, _message: Option<String>) {
        self.steps.lock().unwrap().push(current);
    }
}

#[tokio::test]
async fn test_noisy_response_yields_one_candidate() {
    let generator = Arc::new(ScriptedGenerator::always(NOISY_RESPONSE));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator.clone());
    let texts = strings(&["tax is high", "refund late"]);

    let report = pipeline
        .generate_narratives(texts.as_slice(), 1, 2, &NoopProgressReporter)
        .await
        .unwrap();

    assert_eq!(report.requested_clusters, 1);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].post_count, 2);
    let candidate = &report.groups[0].candidates[0];
    assert_eq!(report.candidate_count(), 1);
    assert_eq!(candidate.get("narrative_1"), Some("Taxes are too high"));
    assert_eq!(candidate.get("narrative_2"), Some("Refunds are late"));
}

#[tokio::test]
async fn test_prompt_carries_cluster_posts_and_sampling() {
    let generator = Arc::new(ScriptedGenerator::always("{}"));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator.clone());

    pipeline
        .generate_narratives(
            strings(&["alpha post", "beta post"]).as_slice(),
            1,
            3,
            &NoopProgressReporter,
        )
        .await
        .unwrap();

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].system.contains("narrative_3"));
    assert!(prompts[0].user.contains("- alpha post"));
    assert!(prompts[0].user.contains("- beta post"));
    assert_eq!(prompts[0].temperature, 0.9);
    assert_eq!(prompts[0].max_tokens, 512);
}

#[tokio::test]
async fn test_refusal_yields_no_candidates() {
    let generator = Arc::new(ScriptedGenerator::always(
        "I'm sorry, I can't summarize these posts.",
    ));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator);

    let report = pipeline
        .generate_narratives(
            strings(&["one", "two"]).as_slice(),
            1,
            2,
            &NoopProgressReporter,
        )
        .await
        .unwrap();

    assert_eq!(report.candidate_count(), 0);
    assert!(report.to_markdown().is_empty());
}

#[tokio::test]
async fn test_failed_cluster_does_not_abort_others() {
    let embedder = FixedEmbedder::new(vec![0.0, 1.0])
        .with("a1", vec![1.0, 0.0])
        .with("a2", vec![1.0, 0.0]);
    let generator = Arc::new(
        ScriptedGenerator::always(r#"{"narrative_1": "B side"}"#).then(Script::Fail),
    );
    let pipeline = test_pipeline(Arc::new(embedder), generator.clone());
    let progress = RecordingProgress {
        steps: Mutex::new(vec![]),
    };

    let report = pipeline
        .generate_narratives(
            strings(&["a1", "b1", "a2"]).as_slice(),
            2,
            1,
            &progress,
        )
        .await
        .unwrap();

    assert_eq!(generator.call_count(), 2);
    assert_eq!(report.groups.len(), 2);
    assert!(report.groups[0].candidates.is_empty());
    assert_eq!(
        report.groups[1].candidates[0].get("narrative_1"),
        Some("B side")
    );
    assert_eq!(*progress.steps.lock().unwrap(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_generation_times_out_as_empty() {
    let generator = Arc::new(ScriptedGenerator::always("{}").then(Script::Hang));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator);

    let report = pipeline
        .generate_narratives(strings(&["slow"]).as_slice(), 1, 1, &NoopProgressReporter)
        .await
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.candidate_count(), 0);
}

#[tokio::test]
async fn test_disabled_generation_fails_fast() {
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0]));
    let pipeline = test_pipeline(embedder.clone(), Arc::new(NoopGenerationService));

    let result = pipeline
        .generate_narratives(strings(&["x"]).as_slice(), 1, 1, &NoopProgressReporter)
        .await;

    assert!(matches!(result, Err(ScopeError::Provider { .. })));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_zero_per_cluster_rejected() {
    let pipeline = test_pipeline(
        Arc::new(HashingEmbedder),
        Arc::new(ScriptedGenerator::always("{}")),
    );
    let result = pipeline
        .generate_narratives(strings(&["x"]).as_slice(), 1, 0, &NoopProgressReporter)
        .await;
    assert!(matches!(result, Err(ScopeError::InvalidInput(_))));
}

#[tokio::test]
async fn test_trace_then_generate_uses_window_only() {
    let corpus = CorpusBuilder::new()
        .on(1, "outside early")
        .on(4, "inside one")
        .on(5, "inside two")
        .on(9, "outside late")
        .build();
    let generator = Arc::new(ScriptedGenerator::always(
        r#"{"narrative_1": "Inside things"}"#,
    ));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator.clone());

    let trace = pipeline
        .trace(&corpus, "inside", TimeRange::new(day(3), day(6)), 0.0)
        .await
        .unwrap();
    let report = pipeline
        .generate_narratives(&trace, 1, 1, &NoopProgressReporter)
        .await
        .unwrap();

    assert_eq!(report.groups[0].post_count, 2);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].user.contains("inside one"));
    assert!(!prompts[0].user.contains("outside"));
}

#[tokio::test]
async fn test_report_exports_to_json() {
    let generator = Arc::new(ScriptedGenerator::always(NOISY_RESPONSE));
    let pipeline = test_pipeline(Arc::new(HashingEmbedder), generator);
    let report = pipeline
        .generate_narratives(strings(&["p"]).as_slice(), 1, 2, &NoopProgressReporter)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narratives.json");
    report.write_json(&path).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written["groups"][0]["candidates"][0]["narrative_1"],
        "Taxes are too high"
    );
}
