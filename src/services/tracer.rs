//! Time-windowed, threshold-filtered tracing of one narrative through a corpus.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info};

use crate::corpus::parse_timestamp;
use crate::models::{Corpus, Post, TIMESTAMP_FIELD};
use crate::services::similarity::SimilarityEngine;
use crate::ScopeError;

/// Inclusive `[start, end]` window. `start > end` is a valid, empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Parse user-supplied bounds. A bare-date `end` covers that whole day.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScopeError> {
        let start_ts = parse_timestamp(start).ok_or_else(|| {
            ScopeError::InvalidInput(format!("Unrecognized start date '{}'", start))
        })?;
        let end_ts = match NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d") {
            Ok(date) => date
                .and_hms_nano_opt(23, 59, 59, 999_999_999)
                .map(|naive| Utc.from_utc_datetime(&naive)),
            Err(_) => parse_timestamp(end),
        }
        .ok_or_else(|| ScopeError::InvalidInput(format!("Unrecognized end date '{}'", end)))?;
        Ok(Self::new(start_ts, end_ts))
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// A post retained by a trace, with its score and its position in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedPost {
    pub index: usize,
    #[serde(flatten)]
    pub post: Post,
    #[serde(serialize_with = "finite_or_null")]
    pub similarity: f32,
}

fn finite_or_null<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f32(*value)
    } else {
        serializer.serialize_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSummary {
    pub total_posts: usize,
    pub date_range: TimeRange,
    pub threshold: f32,
    pub target_narrative: String,
}

/// Output of [`TemporalTracer::trace`]: records in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredTrace {
    pub records: Vec<TracedPost>,
    pub summary: TraceSummary,
}

impl FilteredTrace {
    fn empty(narrative: &str, range: TimeRange, threshold: f32) -> Self {
        Self {
            records: vec![],
            summary: TraceSummary {
                total_posts: 0,
                date_range: range,
                threshold,
                target_narrative: narrative.to_string(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.post.text.clone()).collect()
    }
}

/// One point of a narrative's similarity over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityPoint {
    pub timestamp: DateTime<Utc>,
    pub similarity: f32,
}

pub struct TemporalTracer {
    engine: Arc<SimilarityEngine>,
}

impl TemporalTracer {
    pub fn new(engine: Arc<SimilarityEngine>) -> Self {
        Self { engine }
    }

    /// Posts inside `range` whose similarity to `narrative` is at least
    /// `threshold`, oldest first. Posts without a timestamp never match.
    pub async fn trace(
        &self,
        corpus: &Corpus,
        narrative: &str,
        range: TimeRange,
        threshold: f32,
    ) -> Result<FilteredTrace, ScopeError> {
        validate_narrative(narrative)?;
        if threshold.is_nan() {
            return Err(ScopeError::InvalidInput(
                "Threshold must be a number".to_string(),
            ));
        }
        if !corpus.has_field(TIMESTAMP_FIELD) {
            return Err(ScopeError::missing_field(TIMESTAMP_FIELD));
        }
        if range.is_empty() {
            debug!(%range, "empty time range, skipping trace");
            return Ok(FilteredTrace::empty(narrative, range, threshold));
        }

        let window: Vec<(usize, &Post)> = corpus
            .posts()
            .iter()
            .enumerate()
            .filter(|(_, post)| post.timestamp.is_some_and(|ts| range.contains(ts)))
            .collect();

        if window.is_empty() {
            debug!(%range, "no posts in time range");
            return Ok(FilteredTrace::empty(narrative, range, threshold));
        }

        let texts: Vec<String> = window.iter().map(|(_, p)| p.text.clone()).collect();
        let matrix = self
            .engine
            .compute(&texts, &[narrative.to_string()])
            .await?;
        let scores = matrix
            .column(0)
            .ok_or_else(|| ScopeError::provider("Similarity matrix has no narrative column"))?;

        let mut records: Vec<TracedPost> = window
            .into_iter()
            .zip(scores)
            .filter(|(_, similarity)| *similarity >= threshold)
            .map(|((index, post), similarity)| TracedPost {
                index,
                post: post.clone(),
                similarity,
            })
            .collect();
        records.sort_by_key(|r| r.post.timestamp);

        info!(
            "Traced {} of {} posts in window for '{}' (threshold {})",
            records.len(),
            texts.len(),
            narrative,
            threshold
        );

        Ok(FilteredTrace {
            summary: TraceSummary {
                total_posts: records.len(),
                date_range: range,
                threshold,
                target_narrative: narrative.to_string(),
            },
            records,
        })
    }

    /// Similarity of every timestamped post to `narrative`, oldest first.
    pub async fn timeseries(
        &self,
        corpus: &Corpus,
        narrative: &str,
    ) -> Result<Vec<SimilarityPoint>, ScopeError> {
        validate_narrative(narrative)?;
        if !corpus.has_field(TIMESTAMP_FIELD) {
            return Err(ScopeError::missing_field(TIMESTAMP_FIELD));
        }

        let mut dated: Vec<(DateTime<Utc>, &str)> = corpus
            .posts()
            .iter()
            .filter_map(|p| p.timestamp.map(|ts| (ts, p.text.as_str())))
            .collect();
        if dated.is_empty() {
            return Ok(vec![]);
        }
        dated.sort_by_key(|(ts, _)| *ts);

        let texts: Vec<String> = dated.iter().map(|(_, t)| t.to_string()).collect();
        let matrix = self
            .engine
            .compute(&texts, &[narrative.to_string()])
            .await?;
        let scores = matrix
            .column(0)
            .ok_or_else(|| ScopeError::provider("Similarity matrix has no narrative column"))?;

        Ok(dated
            .into_iter()
            .zip(scores)
            .map(|((timestamp, _), similarity)| SimilarityPoint {
                timestamp,
                similarity,
            })
            .collect())
    }
}

fn validate_narrative(narrative: &str) -> Result<(), ScopeError> {
    if narrative.trim().is_empty() {
        return Err(ScopeError::InvalidInput(
            "Target narrative must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_expands_date_only_end() {
        let range = TimeRange::parse("2024-01-03", "2024-01-07").unwrap();
        assert_eq!(range.start, ymd(2024, 1, 3));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 7, 18, 0, 0).unwrap()));
        assert!(!range.contains(ymd(2024, 1, 8)));
    }

    #[test]
    fn test_parse_keeps_explicit_end_time() {
        let range = TimeRange::parse("2024-01-03", "2024-01-07T12:00:00Z").unwrap();
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 7, 18, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            TimeRange::parse("soon", "2024-01-07"),
            Err(ScopeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(TimeRange::new(ymd(2024, 2, 1), ymd(2024, 1, 1)).is_empty());
        assert!(!TimeRange::new(ymd(2024, 1, 1), ymd(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_non_finite_similarity_serializes_as_null() {
        let record = TracedPost {
            index: 3,
            post: Post::new("hi"),
            similarity: f32::NAN,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["similarity"], serde_json::Value::Null);
        assert_eq!(json["index"], 3);
        assert_eq!(json["text"], "hi");
    }
}
