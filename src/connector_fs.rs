//! Filesystem connector: every matching text file under a root directory
//! becomes one document.

use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::FilesystemConnectorConfig;
use crate::models::{Document, DocumentMetadata};
use crate::traits::Connector;

pub struct FilesystemConnector {
    name: String,
    config: FilesystemConnectorConfig,
}

impl FilesystemConnector {
    pub fn new(name: String, config: FilesystemConnectorConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Connector for FilesystemConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn connector_type(&self) -> &str {
        "filesystem"
    }

    async fn scan(&self) -> Result<Vec<Document>> {
        let config = self.config.clone();
        let source = self.source_label();
        tokio::task::spawn_blocking(move || scan_filesystem(&config, &source)).await?
    }
}

/// Walk `config.root` and read every included file.
///
/// Files that are not valid UTF-8 are skipped with a warning. Results are
/// sorted by relative path.
pub fn scan_filesystem(config: &FilesystemConnectorConfig, source: &str) -> Result<Vec<Document>> {
    let root = &config.root;
    if !root.exists() {
        bail!(
            "Filesystem connector root does not exist: {}",
            root.display()
        );
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut found: Vec<(String, Document)> = Vec::new();

    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match file_to_document(path, &rel_str, source, &config.doc_type) {
            Ok(doc) => found.push((rel_str, doc)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().map(|(_, doc)| doc).collect())
}

fn file_to_document(
    path: &Path,
    relative_path: &str,
    source: &str,
    doc_type: &str,
) -> Result<Document> {
    let content = std::fs::read_to_string(path)?;

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut metadata = DocumentMetadata::new(source, doc_type)
        .with_title(title)
        .with_url(format!("file://{}", path.display()));
    metadata.extra.insert(
        "path".to_string(),
        serde_json::Value::String(relative_path.to_string()),
    );

    Ok(Document::new(content, metadata))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
