//! The `lumen process` command: submit images and wait for their results.

use clap::Args;
use lumen_core::{Config, ImageResponse, ImageService, ImageStatus, LumenError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::OutputFormat;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image files, or directories whose JPEG/PNG files are submitted
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Seconds to wait for each image to finish processing
    #[arg(long, default_value = "120")]
    pub timeout: u64,
}

/// Execute the process command.
pub async fn execute(config: Config, args: ProcessArgs) -> anyhow::Result<()> {
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No JPEG or PNG files found in the given inputs");
    }
    tracing::info!("Submitting {} files", files.len());

    let service = ImageService::open(config).await?;
    let result = submit_and_wait(&service, &files, Duration::from_secs(args.timeout)).await;
    service.shutdown().await;
    let (responses, summary) = result?;

    super::emit_all(&responses, args.format, args.output.as_deref())?;
    summary.print();
    Ok(())
}

#[derive(Debug, Default)]
struct Summary {
    succeeded: u64,
    failed: u64,
    rejected: u64,
    pending: u64,
    elapsed: Duration,
}

impl Summary {
    fn print(&self) {
        eprintln!();
        eprintln!("  ====================================");
        eprintln!("               Summary");
        eprintln!("  ====================================");
        eprintln!("    Succeeded:    {:>8}", self.succeeded);
        if self.failed > 0 {
            eprintln!("    Failed:       {:>8}", self.failed);
        }
        if self.rejected > 0 {
            eprintln!("    Rejected:     {:>8}", self.rejected);
        }
        if self.pending > 0 {
            eprintln!("    Still queued: {:>8}", self.pending);
        }
        eprintln!("  ------------------------------------");
        eprintln!("    Duration:     {:>7.1}s", self.elapsed.as_secs_f64());
        eprintln!("  ====================================");
    }
}

async fn submit_and_wait(
    service: &ImageService,
    files: &[PathBuf],
    timeout: Duration,
) -> anyhow::Result<(Vec<ImageResponse>, Summary)> {
    let start = Instant::now();
    let mut summary = Summary::default();
    let mut accepted = Vec::with_capacity(files.len());

    for path in files {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match service.submit(&name, &bytes).await {
            Ok(record) => accepted.push(record),
            Err(LumenError::Pipeline(e)) => {
                tracing::warn!("Rejected {:?}: {e}", path);
                summary.rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let progress = create_progress_bar(accepted.len() as u64);
    let mut responses = Vec::with_capacity(accepted.len());
    for record in &accepted {
        progress.set_message(record.original_name.clone());
        let record = match service.wait_for(&record.id, timeout).await {
            Ok(done) => done,
            Err(LumenError::WaitTimeout { .. }) => {
                tracing::warn!("{} still processing after {timeout:?}", record.id);
                service.get(&record.id).await?
            }
            Err(e) => return Err(e.into()),
        };
        match record.status {
            ImageStatus::Success => summary.succeeded += 1,
            ImageStatus::Failed => summary.failed += 1,
            ImageStatus::Processing => summary.pending += 1,
        }
        responses.push(ImageResponse::from_record(&record));
        progress.inc(1);
    }
    progress.finish_with_message("done");

    summary.elapsed = start.elapsed();
    Ok((responses, summary))
}

/// Expand inputs: files are taken as given, directories contribute their
/// JPEG/PNG files (non-recursive, sorted by name).
fn collect_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && has_image_extension(path))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            anyhow::bail!(
                "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
                input
            );
        }
    }
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message("waiting...");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_filters_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.jpeg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        let explicit = dir.path().join("notes.txt");

        let files = collect_inputs(&[dir.path().to_path_buf(), explicit.clone()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.jpeg", "notes.txt"]);
    }

    #[test]
    fn test_collect_inputs_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_inputs(&[dir.path().join("nope.jpg")]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
