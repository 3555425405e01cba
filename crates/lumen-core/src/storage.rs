//! On-disk layout for originals and thumbnails.
//!
//! ```text
//! <root>/originals/<id>.<ext>
//! <root>/thumbnails/small/<id>.jpg
//! <root>/thumbnails/medium/<id>.jpg
//! ```
//!
//! Directories are created on first write.

use std::path::{Path, PathBuf};

use crate::pipeline::validate::SupportedFormat;
use crate::types::ThumbnailSize;

/// File storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.root.join("originals")
    }

    pub fn thumbnails_dir(&self, size: ThumbnailSize) -> PathBuf {
        self.root.join("thumbnails").join(size.as_str())
    }

    /// Where the thumbnail of `size` for image `id` is written.
    pub fn thumbnail_path(&self, id: &str, size: ThumbnailSize) -> PathBuf {
        self.thumbnails_dir(size).join(format!("{id}.jpg"))
    }

    /// Store the uploaded bytes and return their path.
    pub async fn write_original(
        &self,
        id: &str,
        format: SupportedFormat,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dir = self.originals_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{id}.{}", format.extension()));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Write a derived file, creating its directory if needed.
    pub async fn write_derivative(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }
}
