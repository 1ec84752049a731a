//! TOML configuration parsing and validation.
//!
//! Every section except `[connectors]` is optional and falls back to the
//! defaults below. See `config/assist.example.toml` for a full example.

use anyhow::{bail, Context, Result};
use assist_harness_core::cache::{
    CacheConfig as CoreCacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_SIMILARITY_THRESHOLD,
};
use assist_harness_core::chunk::{ChunkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use assist_harness_core::index::DEFAULT_TOP_K;
use chrono::Duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Result<ChunkerConfig> {
        ChunkerConfig::new(self.chunk_size, self.overlap)
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// How long a populated index counts as fresh.
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            refresh_ttl_secs: default_refresh_ttl_secs(),
        }
    }
}

impl RetrievalConfig {
    /// `refresh_ttl_secs` as a [`Duration`].
    ///
    /// Fails if the value is too large to represent.
    pub fn refresh_ttl(&self) -> Result<Duration> {
        i64::try_from(self.refresh_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .with_context(|| {
                format!(
                    "retrieval.refresh_ttl_secs = {} is out of range",
                    self.refresh_ttl_secs
                )
            })
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_refresh_ttl_secs() -> u64 {
    30 * 60
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: default_cache_ttl_secs(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl CacheConfig {
    /// The core cache settings (TTL in milliseconds).
    pub fn to_core(&self) -> CoreCacheConfig {
        CoreCacheConfig {
            max_entries: self.max_entries,
            ttl_ms: i64::try_from(self.ttl_secs)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
            similarity_threshold: self.similarity_threshold,
        }
    }
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}
fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConnectorsConfig {
    /// Named filesystem connectors: `[connectors.filesystem.<name>]`.
    #[serde(default)]
    pub filesystem: BTreeMap<String, FilesystemConnectorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConnectorConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Value for the `type` metadata field of every document.
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}
fn default_doc_type() -> String {
    "docs".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    config
        .chunking
        .chunker()
        .with_context(|| "invalid [chunking] section")?;

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    config.retrieval.refresh_ttl()?;

    config
        .cache
        .to_core()
        .validate()
        .with_context(|| "invalid [cache] section")?;

    for (name, fs) in &config.connectors.filesystem {
        if fs.include_globs.is_empty() {
            bail!(
                "connectors.filesystem.{}.include_globs must not be empty",
                name
            );
        }
    }

    Ok(())
}
