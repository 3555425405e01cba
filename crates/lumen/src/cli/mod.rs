//! Subcommand implementations.

pub mod config;
pub mod images;
pub mod process;

use clap::ValueEnum;
use lumen_core::{OutputFormat as CoreOutputFormat, OutputWriter};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format for commands that print records.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document (lists become an array)
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Write a list of items to `output`, or pretty-printed to stdout.
pub fn emit_all<T: Serialize>(
    items: &[T],
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = OutputWriter::new(BufWriter::new(file), format.into(), false);
            writer.write_all(items)?;
            writer.flush()?;
            tracing::info!("Wrote {} records to {:?}", writer.items_written(), path);
        }
        None => {
            let stdout = std::io::stdout().lock();
            let mut writer = OutputWriter::new(stdout, format.into(), true);
            writer.write_all(items)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Write one item to stdout.
pub fn emit<T: Serialize>(item: &T, format: OutputFormat) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    OutputWriter::new(&mut stdout, format.into(), true).write(item)?;
    stdout.flush()?;
    Ok(())
}
