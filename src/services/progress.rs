//! Progress reporting for long-running pipeline stages.
//!
//! Services report through [`ProgressReporter`] without knowing whether a
//! terminal progress bar, a log line or nothing at all is on the other end.
//! Reports are advisory and never fail the caller.

use std::sync::Arc;

use async_trait::async_trait;

/// Reports progress for long-running operations.
///
/// `current` runs from 0.0 to `total`; `message` describes the step.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, current: f64, total: f64, message: Option<String>);

    /// Report completion of `step` out of `total_steps`.
    async fn step(&self, step: usize, total_steps: usize, message: &str) {
        let current = if total_steps == 0 {
            1.0
        } else {
            step as f64 / total_steps as f64
        };
        self.report(current, 1.0, Some(message.to_string())).await;
    }
}

/// Discards every report.
pub struct NoopProgressReporter;

#[async_trait]
impl ProgressReporter for NoopProgressReporter {
    async fn report(&self, _current: f64, _total: f64, _message: Option<String>) {}
}

/// Forwards reports to `tracing` at debug level.
pub struct LogProgressReporter {
    label: String,
}

impl LogProgressReporter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl ProgressReporter for LogProgressReporter {
    async fn report(&self, current: f64, total: f64, message: Option<String>) {
        let pct = if total > 0.0 {
            (current / total * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };
        tracing::debug!(
            stage = %self.label,
            "{:.0}% {}",
            pct,
            message.unwrap_or_default()
        );
    }
}

pub fn noop_progress() -> Arc<dyn ProgressReporter> {
    Arc::new(NoopProgressReporter)
}
