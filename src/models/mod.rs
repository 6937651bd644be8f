pub mod narrative;
pub mod post;

pub use narrative::{display_key, NarrativeCandidate, NarrativeGroup, NarrativeReport};
pub use post::{Corpus, Post, AUTHOR_FIELD, TEXT_FIELD, TIMESTAMP_FIELD};
