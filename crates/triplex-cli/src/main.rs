//! Triplex CLI - Headless HLS Comparison Harness
//!
//! Features:
//! - Built-in test stream catalog
//! - Host capability reports
//! - Stream reachability probes
//! - Timed comparison runs (native vs standard engine vs tuned ABR)
//! - Persistent result log with JSON export

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use triplex_core::results::DEFAULT_STORE_FILE;
use triplex_core::ResultStore;

mod commands;
mod output;

/// Triplex CLI - HLS comparison toolkit
#[derive(Parser)]
#[command(name = "triplex")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Side-by-side HLS playback comparison harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Result log location
    #[arg(long, default_value = DEFAULT_STORE_FILE, value_name = "PATH")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in test streams
    Streams {
        /// Category filter (all, vod, live, low-res, high-res, mobile)
        #[arg(short, long, default_value = "all")]
        category: String,
    },

    /// Report host playback capabilities
    Env {
        /// Host cannot decode HLS natively
        #[arg(long)]
        no_native: bool,

        /// Adaptive engine cannot run
        #[arg(long)]
        no_engine: bool,
    },

    /// Check a stream for reachability
    Probe {
        /// Catalog index, name fragment, or URL
        stream: String,

        /// Append the outcome to the result log
        #[arg(short, long)]
        record: bool,
    },

    /// Run a timed comparison across playback slots
    Run {
        /// Catalog index, name fragment, or URL
        stream: String,

        /// Harness mode (single, dual, triple)
        #[arg(short, long, default_value = "triple")]
        mode: String,

        /// Playback time in seconds
        #[arg(short, long, default_value = "8")]
        duration: u64,

        /// Seek every slot to this position halfway through the run
        #[arg(long)]
        seek_to: Option<f64>,

        /// Host cannot decode HLS natively
        #[arg(long)]
        no_native: bool,

        /// Adaptive engine cannot run
        #[arg(long)]
        no_engine: bool,

        /// Append per-slot outcomes to the result log
        #[arg(short, long)]
        record: bool,
    },

    /// Show the result log
    Results {
        /// Entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Append a note to the result log
    Note {
        /// Note text
        text: String,

        /// Stream the note refers to (catalog index, name fragment, or URL)
        #[arg(short, long)]
        stream: Option<String>,
    },

    /// Export the result log as dated JSON
    Export {
        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Delete the result log
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    let store = ResultStore::new(&cli.store);

    match cli.command {
        Commands::Streams { category } => {
            commands::streams(&category, &cli.format)?;
        }
        Commands::Env { no_native, no_engine } => {
            commands::env(no_native, no_engine, &cli.format)?;
        }
        Commands::Probe { stream, record } => {
            commands::probe(&stream, record, &store, &cli.format).await?;
        }
        Commands::Run { stream, mode, duration, seek_to, no_native, no_engine, record } => {
            let options = commands::RunOptions {
                mode,
                duration,
                seek_to,
                no_native,
                no_engine,
                record,
            };
            commands::run(&stream, options, &store, &cli.format).await?;
        }
        Commands::Results { limit } => {
            commands::results(limit, &store, &cli.format)?;
        }
        Commands::Note { text, stream } => {
            commands::note(&text, stream.as_deref(), &store, &cli.format)?;
        }
        Commands::Export { dir } => {
            commands::export(&dir, &store, &cli.format)?;
        }
        Commands::Clear => {
            commands::clear(&store, &cli.format)?;
        }
    }

    Ok(())
}
