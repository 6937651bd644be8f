//! Terminal progress bar for long-running CLI commands.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::ProgressReporter;

const BAR_LENGTH: u64 = 1000;

/// Draws an `indicatif` bar on stderr. Hidden in JSON mode so stdout stays
/// machine-readable and stderr stays quiet.
pub struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    pub fn new(label: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(BAR_LENGTH)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {percent:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(label.to_string());
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl ProgressReporter for BarProgressReporter {
    async fn report(&self, current: f64, total: f64, message: Option<String>) {
        let fraction = if total > 0.0 {
            (current / total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.bar.set_position((fraction * BAR_LENGTH as f64).round() as u64);
        if let Some(message) = message {
            self.bar.set_message(message);
        }
    }
}
