//! Deterministic caption built from image brightness and dimensions.

use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Build the fallback caption for the image at `path`.
///
/// Reads and decodes the file off the async runtime. Never fails: if the
/// brightness cannot be computed, the shorter form without it is returned.
pub async fn fallback_caption(path: &Path, format: &str, width: u32, height: u32) -> String {
    let path: PathBuf = path.to_path_buf();
    let brightness = match tokio::task::spawn_blocking(move || mean_luminance_of_file(&path)).await
    {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::debug!("Brightness unavailable for fallback caption: {e}");
            None
        }
        Err(e) => {
            tracing::warn!("Brightness task failed: {e}");
            None
        }
    };
    fallback_text(brightness, format, width, height)
}

pub fn fallback_text(brightness: Option<f64>, format: &str, width: u32, height: u32) -> String {
    let format = format.to_uppercase();
    match brightness {
        Some(value) => format!(
            "A {} {} {format} image with resolution {width}x{height}.",
            brightness_label(value),
            orientation(width, height),
        ),
        None => format!("A {format} image with resolution {width}x{height}."),
    }
}

pub fn brightness_label(value: f64) -> &'static str {
    if value < 70.0 {
        "dark"
    } else if value > 180.0 {
        "bright"
    } else {
        "moderately lit"
    }
}

fn orientation(width: u32, height: u32) -> &'static str {
    if width >= height {
        "landscape"
    } else {
        "portrait"
    }
}

fn mean_luminance_of_file(path: &Path) -> Result<f64, image::ImageError> {
    let img = image::open(path)?;
    Ok(mean_luminance(&img))
}

/// Mean 8-bit luma using ITU-R 601 weights, each pixel rounded to an integer
/// level before averaging.
pub fn mean_luminance(img: &DynamicImage) -> f64 {
    let rgb = img.to_rgb8();
    let count = u64::from(rgb.width()) * u64::from(rgb.height());
    if count == 0 {
        return 0.0;
    }
    let total: u64 = rgb
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (u64::from(r) * 299 + u64::from(g) * 587 + u64::from(b) * 114 + 500) / 1000
        })
        .sum();
    total as f64 / count as f64
}
