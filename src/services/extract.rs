//! Best-effort recovery of JSON objects from free-form model output.
//!
//! Models wrap JSON in code fences, prose, apologies, or several attempts at
//! once. Every brace-delimited span is tried independently; spans that do not
//! parse are logged and skipped, never fatal.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::ScopeError;

/// Shortest `{ ... }` spans, across newlines. Nested objects do not survive.
static OBJECT_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());

/// Every JSON value parsed from a brace-delimited span of `text`, in order.
pub fn extract_json_objects(text: &str) -> Vec<Value> {
    OBJECT_SPAN
        .find_iter(text)
        .filter_map(|m| match parse_fragment(m.as_str()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{}. Skipping invalid JSON object.", e);
                None
            }
        })
        .collect()
}

fn parse_fragment(fragment: &str) -> Result<Value, ScopeError> {
    serde_json::from_str(fragment)
        .map_err(|e| ScopeError::Parse(format!("Invalid JSON fragment ({}): {}", e, preview(fragment))))
}

fn preview(fragment: &str) -> String {
    const MAX: usize = 60;
    if fragment.chars().count() <= MAX {
        fragment.to_string()
    } else {
        format!("{}...", fragment.chars().take(MAX).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_object_surrounded_by_noise() {
        let found = extract_json_objects(r#"noise {"narrative_1": "X", "narrative_2": "Y"} noise"#);
        assert_eq!(found, vec![json!({"narrative_1": "X", "narrative_2": "Y"})]);
    }

    #[test]
    fn test_refusal_yields_nothing() {
        assert!(extract_json_objects("sorry I cannot comply").is_empty());
    }

    #[test]
    fn test_fenced_block_across_lines() {
        let response = "Here you go:\n```json\n{\n  \"narrative_1\": \"Prices are rising\"\n}\n```\nThanks!";
        assert_eq!(
            extract_json_objects(response),
            vec![json!({"narrative_1": "Prices are rising"})]
        );
    }

    #[test]
    fn test_bad_fragment_skipped_good_one_kept() {
        let response = r#"{narrative_1: unquoted} then {"narrative_1": "ok"}"#;
        assert_eq!(
            extract_json_objects(response),
            vec![json!({"narrative_1": "ok"})]
        );
    }

    #[test]
    fn test_multiple_objects_in_order() {
        let response = r#"{"a": "1"}{"b": "2"} and {"c": "3"}"#;
        assert_eq!(
            extract_json_objects(response),
            vec![json!({"a": "1"}), json!({"b": "2"}), json!({"c": "3"})]
        );
    }

    #[test]
    fn test_nested_object_is_skipped() {
        assert!(extract_json_objects(r#"{"outer": {"inner": "x"}}"#).is_empty());
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(extract_json_objects("{ never closed").is_empty());
        assert!(extract_json_objects("} backwards {").is_empty());
        assert_eq!(extract_json_objects("{}"), vec![json!({})]);
    }

    #[test]
    fn test_preview_truncates_long_fragments() {
        let long = "x".repeat(100);
        assert_eq!(preview(&long).len(), 63);
        assert_eq!(preview("short"), "short");
    }
}
