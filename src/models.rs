//! Data models, re-exported from the core crate.

pub use assist_harness_core::models::{Chunk, Document, DocumentMetadata};
