//! Test data builders for corpus construction.

use chrono::{DateTime, TimeZone, Utc};
use narrascope::models::{Corpus, Post};

/// Midnight UTC on the given day of January 2024.
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fluent corpus builder.
#[derive(Default)]
pub struct CorpusBuilder {
    posts: Vec<Post>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a post dated on January `d`.
    pub fn on(mut self, d: u32, text: &str) -> Self {
        self.posts.push(Post::new(text).at(day(d)));
        self
    }

    /// Add a post with an explicit timestamp.
    pub fn at(mut self, ts: DateTime<Utc>, text: &str) -> Self {
        self.posts.push(Post::new(text).at(ts));
        self
    }

    /// Add an undated post.
    pub fn undated(mut self, text: &str) -> Self {
        self.posts.push(Post::new(text));
        self
    }

    pub fn build(self) -> Corpus {
        Corpus::new(self.posts)
    }
}
