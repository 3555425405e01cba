//! Upload validation before anything is stored or queued.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// The container formats the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedFormat {
    Jpeg,
    Png,
}

impl SupportedFormat {
    /// Map a detected container format onto the accepted set.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    /// Lower-case canonical name ("jpeg", "png").
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// File extension used for stored originals and the record's `format`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedImage {
    pub format: SupportedFormat,
    pub width: u32,
    pub height: u32,
}

/// Validates uploaded bytes.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check that `bytes` hold a JPEG or PNG and read its dimensions.
    ///
    /// Only the container header is parsed; pixel data is not decoded.
    pub fn validate(&self, bytes: &[u8]) -> Result<ValidatedImage, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput("empty file".to_string()));
        }
        if bytes.len() as u64 > self.limits.max_upload_bytes() {
            return Err(PipelineError::InvalidInput("file too large".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| invalid_image())?;

        let detected = reader.format().ok_or_else(invalid_image)?;
        let format = SupportedFormat::from_image_format(detected).ok_or_else(|| {
            PipelineError::UnsupportedFormat {
                format: format!("{detected:?}").to_lowercase(),
            }
        })?;

        let (width, height) = reader.into_dimensions().map_err(|e| {
            tracing::debug!("Header parse failed for {} upload: {e}", format.name());
            invalid_image()
        })?;

        Ok(ValidatedImage {
            format,
            width,
            height,
        })
    }
}

fn invalid_image() -> PipelineError {
    PipelineError::InvalidInput("invalid image file".to_string())
}
