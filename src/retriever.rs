//! Retrieval orchestrator.
//!
//! Owns the [`KnowledgeBase`] and the connectors that feed it. The index is
//! rebuilt wholesale by [`Retriever::refresh`]: all connectors are scanned
//! concurrently, a fresh index is built from whatever they return, and it
//! replaces the old one in a single swap. A failing connector is logged and
//! contributes nothing; the others are unaffected.
//!
//! Refreshes are serialized. A caller that arrives while a refresh is in
//! flight waits for it and then, unless forced, finds the index fresh and
//! returns without scanning again.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;

use anyhow::{anyhow, Result};
use assist_harness_core::chunk::ChunkerConfig;
use assist_harness_core::index::{IndexStats, KnowledgeBase, SearchHit};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::traits::ConnectorRegistry;

/// Retriever status, safe to serialize into an admin response.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStats {
    pub index: IndexStats,
    /// When the index was last rebuilt, if ever.
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Connectors that failed during the last rebuild.
    pub sources_failed: usize,
}

#[derive(Debug, Default)]
struct RefreshStatus {
    last_refreshed: Option<DateTime<Utc>>,
    sources_failed: usize,
}

pub struct Retriever {
    connectors: ConnectorRegistry,
    index: RwLock<KnowledgeBase>,
    status: Mutex<RefreshStatus>,
    /// Held for the whole duration of a refresh.
    refresh_lock: tokio::sync::Mutex<()>,
    refresh_ttl: Duration,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        connectors: ConnectorRegistry,
        chunker: ChunkerConfig,
        refresh_ttl: Duration,
        top_k: usize,
    ) -> Self {
        Self {
            connectors,
            index: RwLock::new(KnowledgeBase::new(chunker)),
            status: Mutex::new(RefreshStatus::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            refresh_ttl,
            top_k,
        }
    }

    /// Build a retriever from config sections, with the given connectors.
    ///
    /// Fails if the chunking section is invalid or the refresh TTL does not
    /// fit in a [`Duration`].
    pub fn from_config(config: &Config, connectors: ConnectorRegistry) -> Result<Self> {
        let chunker = config.chunking.chunker()?;
        let ttl = config.retrieval.refresh_ttl()?;
        Ok(Self::new(connectors, chunker, ttl, config.retrieval.top_k))
    }

    /// Rebuild the index from every connector.
    ///
    /// Without `force`, does nothing if the index was rebuilt within the
    /// refresh TTL. Never fails: connector errors are logged and skipped.
    pub async fn refresh(&self, force: bool) -> RetrieverStats {
        let _guard = self.refresh_lock.lock().await;

        if !force && self.is_fresh() {
            debug!("index is fresh, skipping refresh");
            return self.stats();
        }

        let started = Instant::now();
        let chunker = *self.read_index().chunker();

        // Each scan runs in its own task so a panicking connector surfaces
        // as a `JoinError` instead of unwinding through the refresh.
        let scans = self.connectors.connectors().iter().map(|connector| {
            let connector = Arc::clone(connector);
            async move {
                let source = connector.source_label();
                let result = match tokio::spawn(async move { connector.scan().await }).await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("scan task aborted: {}", e)),
                };
                (source, result)
            }
        });
        let results = futures::future::join_all(scans).await;

        let mut rebuilt = KnowledgeBase::new(chunker);
        let mut documents = 0usize;
        let mut failed = 0usize;

        for (source, result) in results {
            match result {
                Ok(docs) => {
                    debug!(%source, documents = docs.len(), "source scanned");
                    for doc in &docs {
                        rebuilt.add_document(&doc.content, &doc.metadata);
                    }
                    documents += docs.len();
                }
                Err(e) => {
                    failed += 1;
                    let error = format!("{:#}", e);
                    warn!(%source, %error, "source failed, skipping it this cycle");
                }
            }
        }

        let chunks = rebuilt.len();
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;

        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            status.last_refreshed = Some(Utc::now());
            status.sources_failed = failed;
        }

        info!(
            sources = self.connectors.len(),
            sources_failed = failed,
            documents,
            chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "knowledge base refreshed"
        );

        self.stats()
    }

    /// Search the current index without refreshing it.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        self.read_index().search(query, top_k)
    }

    /// Refresh if stale, search, and render the hits as a context block.
    ///
    /// Returns an empty string when nothing matches.
    pub async fn retrieve_context(&self, query: &str, top_k: Option<usize>) -> String {
        self.refresh(false).await;
        let hits = self.search(query, top_k.unwrap_or(self.top_k));
        debug!(hits = hits.len(), "retrieved context");
        format_context(&hits)
    }

    pub fn stats(&self) -> RetrieverStats {
        let index = self.read_index().stats();
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        RetrieverStats {
            index,
            last_refreshed: status.last_refreshed,
            sources_failed: status.sources_failed,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn is_fresh(&self) -> bool {
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match status.last_refreshed {
            Some(at) => Utc::now() - at < self.refresh_ttl,
            None => false,
        }
    }

    fn read_index(&self) -> RwLockReadGuard<'_, KnowledgeBase> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Render search hits as a context block for the generation backend.
///
/// Each hit becomes a titled section (title falls back to the source label)
/// followed by its source line and text; sections are separated by `---`.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            let meta = &hit.chunk.metadata;
            let title = meta.title.as_deref().unwrap_or(&meta.source);
            let source = match &meta.url {
                Some(url) => format!("{} ({})", meta.source, url),
                None => meta.source.clone(),
            };
            format!(
                "### {}\nSource: {}\n\n{}",
                title, source, hit.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
