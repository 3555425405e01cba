//! Thumbnail generation with JPEG output.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::config::ThumbnailConfig;
use crate::types::ThumbnailSize;

/// Generates fixed-size JPEG thumbnails.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    config: ThumbnailConfig,
}

impl ThumbnailGenerator {
    /// Create a new thumbnail generator with the given configuration.
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Bounding box edge for a thumbnail size.
    pub fn box_size(&self, size: ThumbnailSize) -> u32 {
        match size {
            ThumbnailSize::Small => self.config.small_size,
            ThumbnailSize::Medium => self.config.medium_size,
        }
    }

    /// Render a thumbnail and return the JPEG bytes.
    ///
    /// The image is flattened to RGB first; any alpha channel is discarded
    /// since JPEG has none.
    pub fn generate_bytes(
        &self,
        image: &DynamicImage,
        size: ThumbnailSize,
    ) -> Result<Vec<u8>, image::ImageError> {
        let max = self.box_size(size);
        let rgb = image.to_rgb8();
        let (width, height) = fit_within(rgb.width(), rgb.height(), max);

        let resized: RgbImage = if (width, height) == rgb.dimensions() {
            rgb
        } else {
            imageops::resize(&rgb, width, height, FilterType::CatmullRom)
        };

        let mut buffer = Vec::new();
        resized.write_with_encoder(JpegEncoder::new_with_quality(
            &mut buffer,
            self.config.quality,
        ))?;
        Ok(buffer)
    }
}

/// Scale `(width, height)` down to fit a `max` x `max` box, keeping the
/// aspect ratio. Images already inside the box keep their size.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = f64::from(max) / f64::from(width.max(height));
    let scaled = |edge: u32| ((f64::from(edge) * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}
