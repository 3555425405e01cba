//! Query commands: `show`, `list`, `thumbnail` and `stats`.

use clap::{Args, ValueEnum};
use lumen_core::{Config, ImageResponse, ImageService, ImageStatus, ThumbnailSize};
use std::path::PathBuf;

use super::OutputFormat;

/// Arguments for the `show` command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Image identifier (e.g. img0a1b2c3d4e)
    pub id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list records with this status
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusFilter {
    Processing,
    Success,
    Failed,
}

impl From<StatusFilter> for ImageStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Processing => ImageStatus::Processing,
            StatusFilter::Success => ImageStatus::Success,
            StatusFilter::Failed => ImageStatus::Failed,
        }
    }
}

/// Arguments for the `thumbnail` command.
#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    /// Image identifier
    pub id: String,

    /// Thumbnail size: small or medium
    #[arg(default_value = "medium")]
    pub size: ThumbnailSize,

    /// Copy the JPEG here instead of printing its path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn show(config: Config, args: ShowArgs) -> anyhow::Result<()> {
    let service = ImageService::load(config).await?;
    let response = service.response(&args.id).await?;
    super::emit(&response, args.format)
}

pub async fn list(config: Config, args: ListArgs) -> anyhow::Result<()> {
    let service = ImageService::load(config).await?;
    let wanted = args.status.map(ImageStatus::from);
    let responses: Vec<ImageResponse> = service
        .list()
        .await?
        .iter()
        .filter(|record| wanted.map_or(true, |status| record.status == status))
        .map(ImageResponse::from_record)
        .collect();
    tracing::debug!("Listing {} records", responses.len());
    super::emit_all(&responses, args.format, args.output.as_deref())
}

pub async fn thumbnail(config: Config, args: ThumbnailArgs) -> anyhow::Result<()> {
    let service = ImageService::load(config).await?;
    match args.output {
        Some(destination) => {
            let bytes = service.read_thumbnail(&args.id, args.size).await?;
            tokio::fs::write(&destination, bytes).await?;
            println!("{}", destination.display());
        }
        None => {
            let path = service.thumbnail(&args.id, args.size).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

pub async fn stats(config: Config) -> anyhow::Result<()> {
    let service = ImageService::load(config).await?;
    let stats = service.stats().await?;
    super::emit(&stats, OutputFormat::Json)
}
