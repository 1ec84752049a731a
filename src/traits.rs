//! Source collaborator trait and registry.
//!
//! A [`Connector`] is anything that can produce [`Document`]s for the
//! knowledge base: a directory of markdown files, a repository fetcher, a
//! web crawler. The retriever only ever sees the documents; how a connector
//! obtains them is its own business.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use anyhow::Result;
//! use assist_harness::models::{Document, DocumentMetadata};
//! use assist_harness::traits::{Connector, ConnectorRegistry};
//!
//! struct FaqConnector;
//!
//! #[async_trait]
//! impl Connector for FaqConnector {
//!     fn name(&self) -> &str { "faq" }
//!
//!     async fn scan(&self) -> Result<Vec<Document>> {
//!         Ok(vec![Document::new(
//!             "Q: How do I install it? A: Run the installer from the downloads page.",
//!             DocumentMetadata::new(self.source_label(), "faq"),
//!         )])
//!     }
//! }
//!
//! let mut connectors = ConnectorRegistry::new();
//! connectors.register(FaqConnector);
//! assert_eq!(connectors.len(), 1);
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::models::Document;

/// A document source.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector instance name (e.g. `"handbook"`).
    fn name(&self) -> &str;

    /// Connector type (e.g. `"filesystem"`). Defaults to `"custom"`.
    fn connector_type(&self) -> &str {
        "custom"
    }

    /// Label written into `metadata.source` of every document.
    ///
    /// Defaults to `"{connector_type}:{name}"`.
    fn source_label(&self) -> String {
        format!("{}:{}", self.connector_type(), self.name())
    }

    /// Fetch every document this source currently offers.
    ///
    /// Errors are contained by the caller: a failing connector contributes
    /// no documents to the current refresh and does not affect the others.
    async fn scan(&self) -> Result<Vec<Document>>;
}

/// One line of `assist sources` output.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub connector_type: String,
    pub source_label: String,
}

/// The set of connectors a retriever pulls from.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Registry with every connector declared in the config.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_fs::FilesystemConnector;

        let mut registry = Self::new();
        for (name, cfg) in &config.connectors.filesystem {
            registry.register(FilesystemConnector::new(name.clone(), cfg.clone()));
        }
        registry
    }

    /// Add a connector, taking ownership of it.
    pub fn register(&mut self, connector: impl Connector + 'static) {
        self.connectors.push(Arc::new(connector));
    }

    /// Add a connector that is already shared, e.g. one a test keeps a
    /// handle to.
    pub fn register_arc(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.push(connector);
    }

    /// Every registered connector, in registration order.
    pub fn connectors(&self) -> &[Arc<dyn Connector>] {
        &self.connectors
    }

    /// Name, type and source label of each connector, for listings.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.connectors
            .iter()
            .map(|c| SourceInfo {
                name: c.name().to_string(),
                connector_type: c.connector_type().to_string(),
                source_label: c.source_label(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }
}
