//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod progress;
pub mod table;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "docsnap")]
#[command(about = "Versioned per-tenant document snapshots for grounded question answering")]
#[command(version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .docsnap/
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index documents into a new snapshot
    Ingest(commands::ingest::IngestArgs),
    /// Answer a question from a snapshot
    Ask(commands::ask::AskArgs),
    /// Rank snapshot chunks against a query without generating an answer
    Search(commands::search::SearchArgs),
    /// Inspect published snapshots
    Snapshots(commands::snapshots::SnapshotsArgs),
}

/// Report a failed command and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
