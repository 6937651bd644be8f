//! Narrative candidates produced by cluster summarization, and the
//! user-facing report built from them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ScopeError;

/// One structured summarization result: key (`narrative_1`, ...) to narrative text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NarrativeCandidate(BTreeMap<String, String>);

impl NarrativeCandidate {
    /// Convert a parsed JSON value into a candidate.
    ///
    /// Only objects qualify. Non-string and blank values are dropped; an object
    /// with nothing left yields `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(map) = value else {
            return None;
        };
        let narratives: BTreeMap<String, String> = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) if !s.trim().is_empty() => {
                    Some((key, s.trim().to_string()))
                }
                _ => None,
            })
            .collect();
        if narratives.is_empty() {
            None
        } else {
            Some(Self(narratives))
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered by numeric key suffix, so `narrative_10` follows `narrative_9`.
    pub fn narratives(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|a, b| key_order(a.0).cmp(&key_order(b.0)));
        entries
    }
}

fn key_order(key: &str) -> (Option<usize>, &str) {
    let suffix = key.rsplit('_').next().and_then(|s| s.parse::<usize>().ok());
    (suffix, key)
}

/// `narrative_1` -> `Narrative 1`.
pub fn display_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Narratives derived from one populated cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeGroup {
    pub cluster_index: usize,
    pub post_count: usize,
    pub candidates: Vec<NarrativeCandidate>,
}

/// Result of the generate-narratives operation.
///
/// Only populated clusters appear in `groups`; `requested_clusters` records how
/// many the caller asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub requested_clusters: usize,
    pub groups: Vec<NarrativeGroup>,
}

impl NarrativeReport {
    pub fn candidate_count(&self) -> usize {
        self.groups.iter().map(|g| g.candidates.len()).sum()
    }

    /// Render as Markdown, one `Narrative Set` per candidate.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let mut set = 0;
        for group in &self.groups {
            for candidate in &group.candidates {
                if candidate.is_empty() {
                    continue;
                }
                set += 1;
                out.push_str(&format!(
                    "### Narrative Set {} (cluster {}, {} posts)\n",
                    set, group.cluster_index, group.post_count
                ));
                for (key, value) in candidate.narratives() {
                    out.push_str(&format!("- **{}**: {}\n", display_key(key), value));
                }
                out.push_str("\n---\n\n");
            }
        }
        out.trim().to_string()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ScopeError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
