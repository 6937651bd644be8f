//! Corpus posts and the corpus container.
//!
//! A [`Corpus`] is an ordered list of [`Post`]s plus the set of field names the
//! source actually carried. Schema checks (e.g. "does this corpus have
//! timestamps at all?") consult the field set, not individual posts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TEXT_FIELD: &str = "text";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const AUTHOR_FIELD: &str = "author";

/// One corpus row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
    /// Row number in the source file, when loaded from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_row: Option<usize>,
    /// Passthrough columns that the pipeline never interprets.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Post {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
            author: None,
            source_row: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// An ordered collection of posts with its declared field set.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    posts: Vec<Post>,
    fields: BTreeSet<String>,
}

impl Corpus {
    /// Build a corpus, inferring the field set from the posts themselves.
    pub fn new(posts: Vec<Post>) -> Self {
        let mut fields = BTreeSet::new();
        fields.insert(TEXT_FIELD.to_string());
        for post in &posts {
            if post.timestamp.is_some() {
                fields.insert(TIMESTAMP_FIELD.to_string());
            }
            if post.author.is_some() {
                fields.insert(AUTHOR_FIELD.to_string());
            }
            fields.extend(post.metadata.keys().cloned());
        }
        Self { posts, fields }
    }

    /// Build a corpus with an explicit field set (e.g. from a file header).
    pub fn with_fields<I, S>(posts: Vec<Post>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
        fields.insert(TEXT_FIELD.to_string());
        Self { posts, fields }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts.iter().map(|p| p.text.clone()).collect()
    }

    /// The first `n` posts, keeping the field set.
    pub fn head(&self, n: usize) -> Corpus {
        Corpus {
            posts: self.posts.iter().take(n).cloned().collect(),
            fields: self.fields.clone(),
        }
    }

    /// Stable sort by timestamp; posts without a timestamp go last.
    pub fn sort_chronologically(&mut self) {
        self.posts.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }
}
