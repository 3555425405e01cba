//! Lumen CLI - submit images to the processing queue and inspect results.
//!
//! Each image is validated, stored, and processed in the background into
//! dimensions, EXIF metadata, two JPEG thumbnails and a caption. Records live
//! in a SQLite database under the storage root.
//!
//! # Usage
//!
//! ```bash
//! # Process images and print their records
//! lumen process photo.jpg ./scans/
//!
//! # Inspect results
//! lumen list --status failed
//! lumen show img0a1b2c3d4e
//! lumen thumbnail img0a1b2c3d4e small --output thumb.jpg
//! lumen stats
//!
//! # View configuration
//! lumen config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Lumen - asynchronous image ingestion and processing.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Storage root, overriding `storage.root` from the config file
    #[arg(long, global = true, env = "LUMEN_STORAGE")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process images and print their records
    Process(cli::process::ProcessArgs),

    /// Show one image record
    Show(cli::images::ShowArgs),

    /// List image records, newest first
    List(cli::images::ListArgs),

    /// Locate or export a thumbnail
    Thumbnail(cli::images::ThumbnailArgs),

    /// Print processing statistics
    Stats,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let mut config = match lumen_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lumen config path`."
            );
            lumen_core::Config::fallback()
        }
    };
    if let Some(root) = cli.storage {
        config.storage.root = root;
    }
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(config, args).await,
        Commands::Show(args) => cli::images::show(config, args).await,
        Commands::List(args) => cli::images::list(config, args).await,
        Commands::Thumbnail(args) => cli::images::thumbnail(config, args).await,
        Commands::Stats => cli::images::stats(config).await,
        Commands::Config(args) => cli::config::execute(config, args).await,
    }
}
