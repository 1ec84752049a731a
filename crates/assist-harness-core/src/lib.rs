//! # Assist Harness Core
//!
//! Runtime-free retrieval and caching logic for a support assistant:
//! keyword extraction, chunking, an in-memory lexical knowledge base, and a
//! fuzzy question → answer cache.
//!
//! This crate contains no tokio, filesystem I/O, or network code. Every
//! operation is synchronous and CPU-bound; the application crate wraps the
//! [`index::KnowledgeBase`] and [`cache::ResponseCache`] in locks and feeds
//! documents in from its connectors.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Document`, `DocumentMetadata`, `Chunk` |
//! | [`keywords`] | Stopword-filtered keyword extraction |
//! | [`chunk`] | Overlapping sliding-window chunker |
//! | [`index`] | Keyword-scored chunk index |
//! | [`cache`] | Exact + Jaccard response cache with hybrid eviction |

pub mod cache;
pub mod chunk;
pub mod index;
pub mod keywords;
pub mod models;
