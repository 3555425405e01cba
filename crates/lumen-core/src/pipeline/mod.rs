//! Image processing pipeline components.
//!
//! - **validate**: Synchronous upload checks (size, container, header)
//! - **decode**: Full decode on the blocking pool with a timeout
//! - **metadata**: EXIF extraction into `ExifData`
//! - **thumbnail**: JPEG thumbnails fitted into a square box
//! - **processor**: Runs the stages for one stored original
//! - **runner**: Applies the terminal record transition for a job

pub mod decode;
pub mod metadata;
pub mod processor;
pub mod runner;
pub mod thumbnail;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use metadata::MetadataExtractor;
pub use processor::ImageProcessor;
pub use runner::{JobOutcome, ProcessingPipeline};
pub use thumbnail::ThumbnailGenerator;
pub use validate::{SupportedFormat, ValidatedImage, Validator};
