//! Question answering flow: cache → retrieve → generate → cache.
//!
//! The generation backend is external; it is plugged in through the
//! [`Generator`] trait. An empty context string means "no grounding found"
//! and is passed through as-is, so the backend can still answer.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use assist_harness_core::cache::{CacheStats, ResponseCache};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::retriever::Retriever;
use crate::traits::ConnectorRegistry;

/// A completion backend that turns a question plus retrieved context into
/// an answer.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Served from the response cache.
    pub cached: bool,
    /// Retrieved context was non-empty.
    pub context_used: bool,
}

pub struct Assistant {
    retriever: Arc<Retriever>,
    cache: Arc<Mutex<ResponseCache>>,
    generator: Arc<dyn Generator>,
}

impl Assistant {
    pub fn new(
        retriever: Arc<Retriever>,
        cache: Arc<Mutex<ResponseCache>>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            retriever,
            cache,
            generator,
        }
    }

    /// Build the retriever and cache from config.
    pub fn from_config(
        config: &Config,
        connectors: ConnectorRegistry,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let retriever = Arc::new(Retriever::from_config(config, connectors)?);
        let cache = Arc::new(Mutex::new(ResponseCache::new(config.cache.to_core())?));
        Ok(Self::new(retriever, cache, generator))
    }

    /// Answer `question`, consulting the cache first.
    ///
    /// Generator errors propagate and nothing is cached for that question.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let cached = self.lock_cache().get(question);
        if let Some(text) = cached {
            info!("answered from cache");
            return Ok(Answer {
                text,
                cached: true,
                context_used: false,
            });
        }

        let context = self.retriever.retrieve_context(question, None).await;
        let text = self.generator.generate(question, &context).await?;

        let stored = self.lock_cache().put(question, &text);
        debug!(stored, context_chars = context.len(), "generated answer");

        Ok(Answer {
            text,
            cached: false,
            context_used: !context.is_empty(),
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
