//! # Assist Harness
//!
//! **Retrieval and response caching for a documentation support assistant.**
//!
//! Documents from configured sources are chunked into an in-memory
//! keyword index; questions are first checked against a fuzzy response
//! cache, and only on a miss is context retrieved and handed to the
//! generation backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌────────────────┐
//! │ Connectors  │──▶│  Retriever  │──▶│ KnowledgeBase  │
//! │ FS/custom   │   │ refresh+TTL │   │ chunks+keywords│
//! └─────────────┘   └──────┬──────┘   └────────────────┘
//!                          │ context
//!     question ──▶ ┌───────┴──────┐ miss ┌───────────┐
//!                  │ResponseCache │─────▶│ Generator │
//!                  └──────────────┘◀─────└───────────┘
//!                                  answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | `Document`, `DocumentMetadata`, `Chunk` |
//! | [`traits`] | `Connector` trait and `ConnectorRegistry` |
//! | [`connector_fs`] | Filesystem connector |
//! | [`retriever`] | Index refresh lifecycle and context retrieval |
//! | [`assistant`] | Cache → retrieve → generate → cache flow |
//! | [`server`] | JSON HTTP API |
//! | [`logging`] | Tracing subscriber setup |

pub mod assistant;
pub mod config;
pub mod connector_fs;
pub mod logging;
pub mod models;
pub mod retriever;
pub mod server;
pub mod traits;

