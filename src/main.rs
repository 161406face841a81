//! # Collabdoc CLI (`cdoc`)
//!
//! Operator interface for the collabdoc service.
//!
//! ## Usage
//!
//! ```bash
//! cdoc --config ./config/cdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cdoc init` | Create the SQLite database and run schema migrations |
//! | `cdoc serve` | Start the HTTP server |
//! | `cdoc get <slug>` | Print a topic's current document |
//! | `cdoc history <slug>` | Print a topic's revision log, newest first |

mod block_id;
mod config;
mod db;
mod error;
mod migrate;
mod models;
mod patch;
mod revisions;
mod server;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::store::DocumentStore;

/// Collabdoc CLI — a collaborative topic document service with
/// block-level versioning.
#[derive(Parser)]
#[command(
    name = "cdoc",
    about = "Collabdoc — a collaborative topic document service with block-level versioning",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cdoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and revisions
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP server.
    ///
    /// Serves the document API on the configured bind address.
    Serve,

    /// Print a topic's current document.
    Get {
        /// Topic slug.
        slug: String,
    },

    /// Print a topic's revision log, newest first.
    History {
        /// Topic slug.
        slug: String,

        /// Maximum number of revisions to print.
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Initialized database at {}", config.db.path.display());
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
        Commands::Get { slug } => {
            let store = open_store(&config).await?;
            run_get(&store, &slug).await;
        }
        Commands::History { slug, limit } => {
            let store = open_store(&config).await?;
            let limit = limit.unwrap_or(config.documents.history_limit);
            run_history(&store, &slug, limit).await;
        }
    }

    Ok(())
}

async fn open_store(config: &config::Config) -> anyhow::Result<DocumentStore> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(DocumentStore::new(
        pool,
        config.documents.default_format.clone(),
    ))
}

async fn run_get(store: &DocumentStore, slug: &str) {
    let doc = match store.get(slug).await {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("--- Document ---");
    println!("topic:       {}", doc.topic);
    println!("version:     {}", doc.version);
    println!("format:      {}", doc.format);
    println!(
        "created by:  {} ({})",
        doc.created_by,
        doc.created_by_kind.as_str()
    );
    println!(
        "last edit:   {} ({})",
        doc.last_edited_by,
        doc.last_edited_by_kind.as_str()
    );
    println!();

    println!("--- Blocks ({}) ---", doc.blocks.len());
    for block in &doc.blocks {
        match serde_json::to_string_pretty(block) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("(unprintable block {}: {})", block.id, e),
        }
        println!();
    }
}

async fn run_history(store: &DocumentStore, slug: &str, limit: i64) {
    let revisions = match store.history(slug, limit).await {
        Ok(revisions) => revisions,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if revisions.is_empty() {
        println!("No revisions for '{}' yet (still at version 1).", slug);
        return;
    }

    println!("--- History for '{}' ({} revisions) ---", slug, revisions.len());
    for rev in &revisions {
        println!(
            "v{:<4} {} ({})  {}",
            rev.version,
            rev.edited_by,
            rev.edited_by_kind.as_str(),
            rev.edit_summary.as_deref().unwrap_or("(no summary)")
        );
    }
}
