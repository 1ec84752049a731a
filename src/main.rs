//! # Assist Harness CLI (`assist`)
//!
//! ## Usage
//!
//! ```bash
//! assist --config ./config/assist.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `assist sources` | List configured connectors |
//! | `assist search "<query>"` | Rank indexed chunks for a query |
//! | `assist context "<query>"` | Print the context block a backend would receive |
//! | `assist stats` | Index statistics after a refresh |
//! | `assist serve` | Start the JSON HTTP server |
//!
//! Every command except `sources` and `serve` builds the index from all
//! configured connectors before answering.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use assist_harness::config::{self, Config};
use assist_harness::logging;
use assist_harness::retriever::Retriever;
use assist_harness::server;
use assist_harness::traits::ConnectorRegistry;

/// Assist Harness: retrieval and response caching for a support assistant.
#[derive(Parser)]
#[command(
    name = "assist",
    about = "Assist Harness: retrieval and response caching for a support assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/assist.toml")]
    config: PathBuf,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured connectors.
    Sources,

    /// Search the knowledge base.
    ///
    /// Prints each hit with its score, source and a text excerpt.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the formatted context block for a query.
    Context {
        query: String,

        /// Maximum number of chunks (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print index statistics as JSON.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let connectors = ConnectorRegistry::from_config(&cfg);

    match cli.command {
        Commands::Sources => {
            print_sources(&connectors);
        }
        Commands::Search { query, top_k } => {
            let retriever = build_retriever(&cfg, connectors).await?;
            let hits = retriever.search(&query, top_k.unwrap_or(cfg.retrieval.top_k));
            if hits.is_empty() {
                println!("No results.");
            }
            for (i, hit) in hits.iter().enumerate() {
                let meta = &hit.chunk.metadata;
                println!(
                    "{}. [{}] {} - {}",
                    i + 1,
                    hit.score,
                    meta.title.as_deref().unwrap_or("(untitled)"),
                    meta.source
                );
                println!("   {}", excerpt(&hit.chunk.content, 160));
            }
        }
        Commands::Context { query, top_k } => {
            let retriever = build_retriever(&cfg, connectors).await?;
            let context = retriever.retrieve_context(&query, top_k).await;
            if context.is_empty() {
                eprintln!("No context found.");
            } else {
                println!("{}", context);
            }
        }
        Commands::Stats => {
            let retriever = build_retriever(&cfg, connectors).await?;
            println!("{}", serde_json::to_string_pretty(&retriever.stats())?);
        }
        Commands::Serve => {
            server::run_server(&cfg, connectors).await?;
        }
    }

    Ok(())
}

async fn build_retriever(cfg: &Config, connectors: ConnectorRegistry) -> Result<Retriever> {
    let retriever = Retriever::from_config(cfg, connectors)?;
    retriever.refresh(true).await;
    Ok(retriever)
}

fn print_sources(connectors: &ConnectorRegistry) {
    if connectors.is_empty() {
        println!("No connectors configured.");
        return;
    }
    println!("{:<24} {:<12} SOURCE LABEL", "NAME", "TYPE");
    for s in connectors.sources() {
        println!("{:<24} {:<12} {}", s.name, s.connector_type, s.source_label);
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}
