//! In-memory knowledge base with lexical scoring.
//!
//! Documents are chunked on ingestion; each surviving chunk stores its
//! keyword set once. Search is a linear scan that scores every chunk
//! against the query, which is fine for indexes of a few thousand chunks.
//!
//! # Scoring
//!
//! For a query with keyword set `Q` and a chunk with keyword set `C`:
//!
//! | Signal | Points |
//! |--------|--------|
//! | each `q ∈ Q` that is also in `C` | +2 |
//! | each pair `(q, c)` where one contains the other | +1 |
//! | the whole lowercased query appears in the chunk text | +10 |
//! | each `q ∈ Q` that appears anywhere in the chunk text | +1 |
//!
//! Chunks scoring 0 are dropped; the rest are stably sorted by score, so
//! ties keep index order.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::chunk::{chunk_text, ChunkerConfig};
use crate::keywords::extract_keywords;
use crate::models::{Chunk, DocumentMetadata};

/// Chunks whose trimmed text is this many characters or fewer are discarded.
pub const MIN_CHUNK_CHARS: usize = 50;

/// Default number of results returned by [`KnowledgeBase::search`].
pub const DEFAULT_TOP_K: usize = 5;

const EXACT_KEYWORD_POINTS: u32 = 2;
const PARTIAL_KEYWORD_POINTS: u32 = 1;
const PHRASE_POINTS: u32 = 10;
const TERM_IN_TEXT_POINTS: u32 = 1;

/// A chunk returned from [`KnowledgeBase::search`] with its score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: u32,
    pub chunk: Chunk,
}

/// Index summary, safe to serialize straight into an admin response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Documents that contributed at least one chunk.
    pub total_documents: usize,
    pub total_chunks: usize,
    /// Chunk count per source label.
    pub sources: BTreeMap<String, usize>,
}

/// The chunk index.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    chunker: ChunkerConfig,
    chunks: Vec<Chunk>,
    documents: usize,
}

impl KnowledgeBase {
    /// An empty knowledge base that splits documents with `chunker`.
    pub fn new(chunker: ChunkerConfig) -> Self {
        Self {
            chunker,
            chunks: Vec::new(),
            documents: 0,
        }
    }

    /// Chunk `content` and index every chunk longer than [`MIN_CHUNK_CHARS`].
    ///
    /// Returns the number of chunks added. Never fails; empty or tiny
    /// documents simply add nothing.
    pub fn add_document(&mut self, content: &str, metadata: &DocumentMetadata) -> usize {
        let before = self.chunks.len();

        for (chunk_index, text) in chunk_text(content, &self.chunker).into_iter().enumerate() {
            if text.chars().count() <= MIN_CHUNK_CHARS {
                continue;
            }
            let keywords = extract_keywords(&text);
            self.chunks.push(Chunk {
                id: chunk_id(&metadata.source, chunk_index, &text),
                chunk_index,
                content: text,
                metadata: metadata.clone(),
                keywords,
            });
        }

        let added = self.chunks.len() - before;
        if added > 0 {
            self.documents += 1;
        }
        added
    }

    /// Return up to `top_k` chunks ranked by lexical score.
    ///
    /// A query with no usable keywords (only stopwords or short tokens)
    /// returns the first `top_k` chunks in index order with score 0.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let query_keywords = extract_keywords(query);

        if query_keywords.is_empty() {
            return self
                .chunks
                .iter()
                .take(top_k)
                .map(|chunk| SearchHit {
                    score: 0,
                    chunk: chunk.clone(),
                })
                .collect();
        }

        let query_lower = query.to_lowercase();

        let mut scored: Vec<(u32, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| (score_chunk(&query_lower, &query_keywords, chunk), chunk))
            .filter(|(score, _)| *score > 0)
            .collect();

        // `sort_by` is stable: equal scores keep index order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, chunk)| SearchHit {
                score,
                chunk: chunk.clone(),
            })
            .collect()
    }

    /// Summarize the index contents.
    ///
    /// # Returns
    ///
    /// Chunk and document totals plus per-source chunk counts, with sources
    /// in sorted order.
    pub fn stats(&self) -> IndexStats {
        let mut sources: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in &self.chunks {
            *sources.entry(chunk.metadata.source.clone()).or_insert(0) += 1;
        }
        IndexStats {
            total_documents: self.documents,
            total_chunks: self.chunks.len(),
            sources,
        }
    }

    /// Drop every chunk and document count. The chunker settings are kept.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.documents = 0;
    }

    /// All indexed chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The settings used to split new documents.
    pub fn chunker(&self) -> &ChunkerConfig {
        &self.chunker
    }
}

fn score_chunk(query_lower: &str, query_keywords: &HashSet<String>, chunk: &Chunk) -> u32 {
    let content_lower = chunk.content.to_lowercase();
    let mut score = 0;

    for qk in query_keywords {
        if chunk.keywords.contains(qk) {
            score += EXACT_KEYWORD_POINTS;
        }
        for ck in &chunk.keywords {
            if ck.contains(qk.as_str()) || qk.contains(ck.as_str()) {
                score += PARTIAL_KEYWORD_POINTS;
            }
        }
        if content_lower.contains(qk.as_str()) {
            score += TERM_IN_TEXT_POINTS;
        }
    }

    if content_lower.contains(query_lower.trim()) {
        score += PHRASE_POINTS;
    }

    score
}

fn chunk_id(source: &str, chunk_index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(chunk_index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
