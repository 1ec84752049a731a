//! Core data models shared by the index, the cache, and the ingestion side.
//!
//! A [`Document`] is what a source collaborator hands over; a [`Chunk`] is
//! the retrievable unit the [`KnowledgeBase`](crate::index::KnowledgeBase)
//! derives from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Metadata attached to a document by its source.
///
/// `source` and `doc_type` are the only fields the core reads. Anything
/// else a source wants to carry goes through `extra` untouched and is
/// copied onto every chunk derived from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source label, e.g. `"docs"` or `"filesystem:handbook"`.
    pub source: String,
    /// Kind of content, e.g. `"docs"`, `"readme"`, `"faq"`.
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Opaque pass-through fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentMetadata {
    /// Metadata with only the required fields set.
    pub fn new(source: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            doc_type: doc_type.into(),
            ..Default::default()
        }
    }

    /// Set the human-readable title shown in rendered context.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the canonical URL of the document.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the repository the document came from, for code sources.
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }
}

/// A raw document produced by a source collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// A document with the given text and metadata.
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// An indexed window of a document.
///
/// `keywords` is computed once when the chunk is created and never
/// recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// SHA-256 (hex) of the source label, chunk index and content.
    pub id: String,
    /// Position of this chunk within its parent document.
    pub chunk_index: usize,
    /// Trimmed chunk text.
    pub content: String,
    pub metadata: DocumentMetadata,
    #[serde(skip)]
    pub keywords: HashSet<String>,
}
