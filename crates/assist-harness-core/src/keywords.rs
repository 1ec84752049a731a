//! Keyword extraction shared by the knowledge base and the response cache.
//!
//! Text is lowercased, every character outside `[a-z0-9\s-]` becomes a
//! space, and the result is split on whitespace. Tokens of two characters
//! or fewer and common English function words are dropped.
//!
//! ```rust
//! use assist_harness_core::keywords::extract_keywords;
//!
//! let kw = extract_keywords("How do I install Docker on Ubuntu?");
//! assert!(kw.contains("install"));
//! assert!(kw.contains("docker"));
//! assert!(!kw.contains("how"));
//! ```

use std::collections::HashSet;

/// Function words that carry no retrieval signal.
///
/// Words of two characters or fewer are filtered by length before this
/// list is consulted, so they are not repeated here.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "has", "had", "how", "its", "may", "who", "did", "get", "use", "why", "what",
    "when", "where", "which", "with", "this", "that", "these", "those", "from", "have", "been",
    "were", "will", "would", "could", "should", "does", "into", "your", "about", "there",
    "their", "they", "them", "than", "then",
];

/// Tokens must be longer than this many characters to count.
const MIN_TOKEN_LEN: usize = 2;

/// Extract the normalized keyword set of `text`.
///
/// Pure and deterministic. The returned set has no meaningful order.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| !is_stopword(token))
        .collect()
}

/// Whether `word` (already lowercased) is a stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

fn tokenize(text: &str) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

fn clean(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}
