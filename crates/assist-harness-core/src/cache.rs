//! Fuzzy response cache.
//!
//! Stores question → answer pairs so near-identical questions can be
//! answered without another trip to the generation backend.
//!
//! Lookup is two-staged: an exact match on the normalized question (keyed
//! by its first 100 characters), then a Jaccard scan over every live entry.
//! Expired entries are removed lazily during that scan.
//!
//! When full, the entry with the lowest `timestamp + hit_count × 1h` is
//! evicted, so every recorded hit buys an entry one more hour of effective
//! recency.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_TTL_MS: i64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Characters of the normalized question used as the exact-match key.
const KEY_CHARS: usize = 100;
const MIN_QUESTION_CHARS: usize = 10;
const MIN_ANSWER_CHARS: usize = 20;
/// Answers containing any of these are never cached.
const LOW_VALUE_MARKERS: &[&str] = &["error", "try again"];
/// Effective recency each hit adds to an entry's eviction score.
const HIT_BONUS_MS: i64 = 3_600_000;
const TOP_QUESTIONS: usize = 10;

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Entry lifetime in milliseconds.
    pub ttl_ms: i64,
    /// Minimum Jaccard similarity for a fuzzy hit.
    pub similarity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_ms: DEFAULT_TTL_MS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// Check the settings before a cache is built from them.
    ///
    /// # Guarantees
    ///
    /// On success `max_entries` and `ttl_ms` are positive and
    /// `similarity_threshold` lies in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            bail!("cache max_entries must be >= 1");
        }
        if self.ttl_ms <= 0 {
            bail!("cache ttl must be > 0");
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            bail!(
                "cache similarity_threshold must be in (0.0, 1.0], got {}",
                self.similarity_threshold
            );
        }
        Ok(())
    }
}

/// A cached answer.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    /// The question as first asked.
    pub question: String,
    pub question_normalized: String,
    pub answer: String,
    /// Creation time, Unix milliseconds.
    pub timestamp: i64,
    pub hit_count: u64,
}

impl CacheEntry {
    fn eviction_score(&self) -> i64 {
        self.timestamp
            .saturating_add((self.hit_count as i64).saturating_mul(HIT_BONUS_MS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionHits {
    pub question: String,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub total_hits: u64,
    /// Up to ten most-hit questions, most hits first.
    pub top_questions: Vec<QuestionHits>,
}

#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    /// An empty cache. Fails if `config` does not validate.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entries: HashMap::new(),
        })
    }

    /// Look up an answer for `question` at the current wall-clock time.
    pub fn get(&mut self, question: &str) -> Option<String> {
        self.get_at(question, now_ms())
    }

    /// Look up an answer for `question` as of `now` (Unix milliseconds).
    pub fn get_at(&mut self, question: &str, now: i64) -> Option<String> {
        let normalized = normalize_question(question);
        let key = cache_key(&normalized);
        let ttl = self.config.ttl_ms;

        if let Some(entry) = self.entries.get_mut(&key) {
            if now - entry.timestamp < ttl {
                entry.hit_count += 1;
                debug!(hits = entry.hit_count, "cache hit (exact)");
                return Some(entry.answer.clone());
            }
        }

        let words = word_set(&normalized);
        let mut expired: Vec<String> = Vec::new();
        let mut best: Option<(f64, &String)> = None;

        for (entry_key, entry) in &self.entries {
            if now - entry.timestamp >= ttl {
                expired.push(entry_key.clone());
                continue;
            }
            let similarity = jaccard(&words, &word_set(&entry.question_normalized));
            let better = match best {
                None => true,
                Some((best_sim, best_key)) => {
                    similarity > best_sim || (similarity == best_sim && entry_key < best_key)
                }
            };
            if better {
                best = Some((similarity, entry_key));
            }
        }

        let matched = best
            .filter(|(similarity, _)| *similarity >= self.config.similarity_threshold)
            .map(|(similarity, key)| (similarity, key.clone()));

        if !expired.is_empty() {
            debug!(count = expired.len(), "dropping expired cache entries");
            for key in &expired {
                self.entries.remove(key);
            }
        }

        let (similarity, matched_key) = matched?;
        let entry = self.entries.get_mut(&matched_key)?;
        entry.hit_count += 1;
        debug!(similarity, hits = entry.hit_count, "cache hit (fuzzy)");
        Some(entry.answer.clone())
    }

    /// Cache `answer` for `question` at the current wall-clock time.
    ///
    /// Returns `false` if the pair failed the quality gates and was not stored.
    pub fn put(&mut self, question: &str, answer: &str) -> bool {
        self.put_at(question, answer, now_ms())
    }

    /// Cache `answer` for `question` as of `now` (Unix milliseconds).
    pub fn put_at(&mut self, question: &str, answer: &str, now: i64) -> bool {
        if question.chars().count() < MIN_QUESTION_CHARS
            || answer.chars().count() < MIN_ANSWER_CHARS
        {
            debug!("not caching: question or answer too short");
            return false;
        }
        let answer_lower = answer.to_lowercase();
        if LOW_VALUE_MARKERS
            .iter()
            .any(|marker| answer_lower.contains(marker))
        {
            debug!("not caching: answer looks like an error");
            return false;
        }

        let normalized = normalize_question(question);
        let key = cache_key(&normalized);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.evict_one();
        }

        self.entries.insert(
            key,
            CacheEntry {
                question: question.to_string(),
                question_normalized: normalized,
                answer: answer.to_string(),
                timestamp: now,
                hit_count: 0,
            },
        );
        true
    }

    /// Remove the entry with the lowest recency+frequency score.
    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.eviction_score()
                    .cmp(&b.eviction_score())
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            if let Some(entry) = self.entries.remove(&key) {
                debug!(
                    question = %entry.question,
                    hits = entry.hit_count,
                    "evicted cache entry"
                );
            }
        }
    }

    /// Snapshot of the cache contents.
    ///
    /// # Returns
    ///
    /// Entry count, total hits across entries, and up to ten of the most-hit
    /// questions. Expired entries still present are included; they are only
    /// removed by lookups.
    pub fn stats(&self) -> CacheStats {
        let total_hits = self.entries.values().map(|e| e.hit_count).sum();

        let mut top: Vec<&CacheEntry> = self.entries.values().collect();
        top.sort_by(|a, b| {
            b.hit_count
                .cmp(&a.hit_count)
                .then_with(|| a.question.cmp(&b.question))
        });

        CacheStats {
            size: self.entries.len(),
            total_hits,
            top_questions: top
                .into_iter()
                .take(TOP_QUESTIONS)
                .map(|e| QuestionHits {
                    question: e.question.clone(),
                    hits: e.hit_count,
                })
                .collect(),
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The settings this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// Lowercase, drop everything but word characters and whitespace, collapse
/// runs of whitespace, and trim.
pub fn normalize_question(question: &str) -> String {
    question
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of the word sets (words longer than two characters)
/// of two already-normalized questions. Two empty sets score 0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn word_set(normalized: &str) -> HashSet<&str> {
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect()
}

fn cache_key(normalized: &str) -> String {
    normalized.chars().take(KEY_CHARS).collect()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;
    const ANSWER: &str = "Run the installer script from the downloads page.";

    fn cache() -> ResponseCache {
        ResponseCache::new(CacheConfig::default()).unwrap()
    }

    fn small_cache(max_entries: usize, ttl_ms: i64) -> ResponseCache {
        ResponseCache::new(CacheConfig {
            max_entries,
            ttl_ms,
            ..CacheConfig::default()
        })
        .unwrap()
    }

    fn distinct_question(i: usize) -> String {
        format!("question {} unique token{}", i, i)
    }

    #[test]
    fn test_normalize_question() {
        assert_eq!(
            normalize_question("  How do I   install CX Linux on Ubuntu?? "),
            "how do i install cx linux on ubuntu"
        );
        assert_eq!(normalize_question("What's new?"), "whats new");
        assert_eq!(normalize_question("snake_case\tand\nlines"), "snake_case and lines");
        assert_eq!(normalize_question("!!!"), "");
    }

    #[test]
    fn test_jaccard_similarity() {
        assert!((jaccard_similarity("alpha beta gamma", "alpha beta gamma") - 1.0).abs() < 1e-9);
        assert!((jaccard_similarity("alpha beta", "gamma delta")).abs() < 1e-9);
        // Short words are ignored on both sides.
        assert!((jaccard_similarity("is it ok", "no go up")).abs() < 1e-9);
        assert!((jaccard_similarity("alpha beta gamma", "alpha beta delta") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_exact_hit_after_normalization() {
        let mut c = cache();
        assert!(c.put_at("How do I install CX Linux on Ubuntu?", ANSWER, T0));
        assert_eq!(
            c.get_at("how do i install cx linux on ubuntu", T0 + 10).as_deref(),
            Some(ANSWER)
        );
    }

    #[test]
    fn test_fuzzy_hit_above_threshold() {
        let mut c = cache();
        c.put_at(
            "What is the recommended install command for CX Linux servers?",
            ANSWER,
            T0,
        );
        // 8 shared words out of 9 → 0.889
        assert_eq!(
            c.get_at(
                "What is the recommended install command for CX Linux servers today?",
                T0 + 1
            )
            .as_deref(),
            Some(ANSWER)
        );
    }

    #[test]
    fn test_no_fuzzy_hit_below_threshold() {
        let mut c = cache();
        c.put_at(
            "What is the recommended install command for CX Linux servers?",
            ANSWER,
            T0,
        );
        // 8 shared words out of 10 → 0.8
        assert_eq!(
            c.get_at(
                "What is the recommended install command for CX Linux servers running today?",
                T0 + 1
            ),
            None
        );
    }

    #[test]
    fn test_contraction_and_extra_word_is_not_similar_enough() {
        let mut c = cache();
        c.put_at("What is the install command for CX?", ANSWER, T0);
        let sim = jaccard_similarity(
            &normalize_question("What is the install command for CX?"),
            &normalize_question("What's the install command for CX Linux?"),
        );
        assert!((sim - 4.0 / 7.0).abs() < 1e-9);
        assert_eq!(
            c.get_at("What's the install command for CX Linux?", T0 + 1),
            None
        );
    }

    #[test]
    fn test_miss_on_empty_cache() {
        let mut c = cache();
        assert_eq!(c.get_at("anything at all here", T0), None);
    }

    #[test]
    fn test_hits_increase_and_answer_is_stable() {
        let mut c = cache();
        c.put_at("How do I reset my password?", ANSWER, T0);
        for i in 1..=5u64 {
            assert_eq!(
                c.get_at("How do I reset my password?", T0 + i as i64).as_deref(),
                Some(ANSWER)
            );
            assert_eq!(c.stats().total_hits, i);
        }
    }

    #[test]
    fn test_expired_entries_miss_and_are_dropped() {
        let mut c = small_cache(10, 1_000);
        c.put_at("How do I reset my password?", ANSWER, T0);
        assert!(c.get_at("How do I reset my password?", T0 + 999).is_some());
        assert!(c.get_at("How do I reset my password?", T0 + 1_000).is_none());
        assert!(c.is_empty());
    }

    #[test]
    fn test_fuzzy_scan_drops_other_expired_entries() {
        let mut c = small_cache(10, 1_000);
        c.put_at("Where are the release notes kept?", ANSWER, T0);
        c.put_at("How do I reset my password?", ANSWER, T0 + 5_000);
        assert_eq!(c.len(), 2);
        assert!(c.get_at("Completely unrelated question here", T0 + 5_500).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_quality_gates() {
        let mut c = cache();
        assert!(!c.put_at("Too short", ANSWER, T0));
        assert!(!c.put_at("A perfectly fine question?", "short answer", T0));
        assert!(!c.put_at(
            "A perfectly fine question?",
            "An Error occurred while generating the answer.",
            T0
        ));
        assert!(!c.put_at(
            "A perfectly fine question?",
            "Something went wrong, please try again later.",
            T0
        ));
        assert!(c.is_empty());
        assert!(c.put_at("A perfectly fine question?", ANSWER, T0));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_eviction_keeps_size_bounded() {
        let mut c = small_cache(5, DEFAULT_TTL_MS);
        for i in 0..50 {
            c.put_at(&distinct_question(i), ANSWER, T0 + i as i64);
            assert!(c.len() <= 5);
        }
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_eviction_prefers_oldest_least_hit() {
        let mut c = cache();
        for i in 0..500 {
            c.put_at(&distinct_question(i), ANSWER, T0 + i as i64);
        }
        // One hit moves the oldest entry an hour forward.
        assert!(c.get_at(&distinct_question(0), T0 + 600).is_some());

        c.put_at(&distinct_question(500), ANSWER, T0 + 700);
        assert_eq!(c.len(), 500);
        assert!(c.get_at(&distinct_question(1), T0 + 800).is_none());
        assert!(c.get_at(&distinct_question(0), T0 + 800).is_some());
        assert!(c.get_at(&distinct_question(500), T0 + 800).is_some());
    }

    #[test]
    fn test_replacing_existing_question_does_not_evict() {
        let mut c = small_cache(2, DEFAULT_TTL_MS);
        c.put_at(&distinct_question(1), ANSWER, T0);
        c.put_at(&distinct_question(2), ANSWER, T0 + 1);
        c.put_at(
            &distinct_question(1),
            "A newer and better answer for this one.",
            T0 + 2,
        );
        assert_eq!(c.len(), 2);
        assert_eq!(
            c.get_at(&distinct_question(1), T0 + 3).as_deref(),
            Some("A newer and better answer for this one.")
        );
    }

    #[test]
    fn test_stats_top_questions() {
        let mut c = cache();
        for i in 0..12 {
            c.put_at(&distinct_question(i), ANSWER, T0);
            for _ in 0..i {
                c.get_at(&distinct_question(i), T0 + 1);
            }
        }
        let stats = c.stats();
        assert_eq!(stats.size, 12);
        assert_eq!(stats.total_hits, (0..12).sum::<u64>());
        assert_eq!(stats.top_questions.len(), 10);
        assert_eq!(stats.top_questions[0].question, distinct_question(11));
        assert_eq!(stats.top_questions[0].hits, 11);
        assert!(stats
            .top_questions
            .windows(2)
            .all(|w| w[0].hits >= w[1].hits));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["size"], 12);

        c.clear();
        assert_eq!(c.stats().size, 0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ResponseCache::new(CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        })
        .is_err());
        assert!(ResponseCache::new(CacheConfig {
            similarity_threshold: 1.5,
            ..CacheConfig::default()
        })
        .is_err());
        assert!(ResponseCache::new(CacheConfig {
            ttl_ms: 0,
            ..CacheConfig::default()
        })
        .is_err());
    }
}
