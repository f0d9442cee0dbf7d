//! Naive tokenizer shared by the search index and query evaluator.
//!
//! # Invariants
//! - Tokens are lowercase runs of `[a-z0-9#_]`.
//! - No stemming and no stopword removal; order of appearance is kept.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9#_]+").expect("valid token regex"));

/// Splits free text into lowercase tokens, duplicates included.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Deduplicates tokens, keeping first occurrence order.
pub fn unique_tokens(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{tokenize, unique_tokens};

    #[test]
    fn tokenize_keeps_hash_underscore_and_digits() {
        assert_eq!(
            tokenize("Hello World #ai_2024"),
            vec!["hello", "world", "#ai_2024"]
        );
    }

    #[test]
    fn tokenize_empty_input_yields_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  -- !! ").is_empty());
    }

    #[test]
    fn tokenize_keeps_duplicates_and_order() {
        assert_eq!(tokenize("b a b"), vec!["b", "a", "b"]);
        assert_eq!(unique_tokens(tokenize("b a b")), vec!["b", "a"]);
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("graph-theory: intro"), vec!["graph", "theory", "intro"]);
    }
}
