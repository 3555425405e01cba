//! Core data types: the persisted image record and the views derived from it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Processing status of an image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Submitted, waiting for or inside a pipeline run
    Processing,
    /// Terminal: all derived fields are populated
    Success,
    /// Terminal: `error` holds the cause
    Failed,
}

impl ImageStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ImageStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Processing => "processing",
            ImageStatus::Success => "success",
            ImageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ImageStatus::Processing),
            "success" => Ok(ImageStatus::Success),
            "failed" => Ok(ImageStatus::Failed),
            other => Err(format!("unknown image status: {other}")),
        }
    }
}

/// The two thumbnail sizes produced for every image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailSize {
    Small,
    Medium,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 2] = [ThumbnailSize::Small, ThumbnailSize::Medium];

    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Medium => "medium",
        }
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(ThumbnailSize::Small),
            "medium" => Ok(ThumbnailSize::Medium),
            _ => Err("thumbnail size must be small or medium".to_string()),
        }
    }
}

/// A single normalised EXIF value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExifValue {
    Number(serde_json::Number),
    Text(String),
}

impl ExifValue {
    pub fn integer(value: i64) -> Self {
        ExifValue::Number(value.into())
    }

    /// Non-finite floats have no JSON number form and are kept as text.
    pub fn float(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(ExifValue::Number)
            .unwrap_or_else(|| ExifValue::Text(value.to_string()))
    }

    pub fn text(value: impl Into<String>) -> Self {
        ExifValue::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExifValue::Text(s) => Some(s),
            ExifValue::Number(_) => None,
        }
    }
}

/// EXIF tags of the primary image, with GPS fields nested under `GPSInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    #[serde(flatten)]
    pub tags: BTreeMap<String, ExifValue>,

    #[serde(rename = "GPSInfo", default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<BTreeMap<String, ExifValue>>,
}

impl ExifData {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.gps.is_none()
    }

    pub fn get(&self, name: &str) -> Option<&ExifValue> {
        self.tags.get(name)
    }
}

/// Everything a successful pipeline run produces, written in one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// File extension form of the format ("jpg", "png")
    pub format: String,

    /// Size of the stored original in bytes
    pub size_bytes: u64,

    /// Modification time of the stored original
    pub file_datetime: DateTime<Utc>,

    pub caption: String,

    pub exif: ExifData,

    pub small_thumbnail_path: PathBuf,

    pub medium_thumbnail_path: PathBuf,
}

/// The persisted state of one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,

    pub original_name: String,

    pub original_path: PathBuf,

    pub status: ImageStatus,

    pub created_at: DateTime<Utc>,

    /// Present exactly when `status` is `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedFields>,

    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub processing_duration_seconds: Option<f64>,

    #[serde(default)]
    pub error: Option<String>,
}

impl ImageRecord {
    /// A freshly submitted record in the `processing` state.
    pub fn new(
        id: impl Into<String>,
        original_name: impl Into<String>,
        original_path: impl Into<PathBuf>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            original_name: original_name.into(),
            original_path: original_path.into(),
            status: ImageStatus::Processing,
            created_at,
            derived: None,
            processed_at: None,
            processing_duration_seconds: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The terminal success state, with every derived field set.
    pub fn into_success(
        self,
        derived: DerivedFields,
        processed_at: DateTime<Utc>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            status: ImageStatus::Success,
            derived: Some(derived),
            processed_at: Some(processed_at),
            processing_duration_seconds: Some(duration_seconds),
            error: None,
            ..self
        }
    }

    /// The terminal failure state; derived fields stay absent.
    pub fn into_failure(
        self,
        error: impl Into<String>,
        processed_at: DateTime<Utc>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            status: ImageStatus::Failed,
            derived: None,
            processed_at: Some(processed_at),
            processing_duration_seconds: Some(duration_seconds),
            error: Some(error.into()),
            ..self
        }
    }

    /// Path of the thumbnail the pipeline wrote, if it got that far.
    pub fn thumbnail_path(&self, size: ThumbnailSize) -> Option<&Path> {
        self.derived.as_ref().map(|d| match size {
            ThumbnailSize::Small => d.small_thumbnail_path.as_path(),
            ThumbnailSize::Medium => d.medium_thumbnail_path.as_path(),
        })
    }
}

/// UTC timestamp in second precision with a `Z` suffix.
pub fn iso_utc(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Metadata block of an `ImageResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
    pub file_datetime: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// Payload body of an `ImageResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub image_id: String,
    pub original_name: String,
    /// Completion time, or submission time while still processing
    pub processed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    pub thumbnails: BTreeMap<ThumbnailSize, String>,
}

/// Query-side view of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub status: ImageStatus,
    pub data: ImageData,
    pub error: Option<String>,
}

impl ImageResponse {
    /// Build the view of a record. Thumbnails are reported as file paths.
    pub fn from_record(record: &ImageRecord) -> Self {
        let mut thumbnails = BTreeMap::new();
        let metadata = record.derived.as_ref().map(|derived| {
            for size in ThumbnailSize::ALL {
                if let Some(path) = record.thumbnail_path(size) {
                    thumbnails.insert(size, path.display().to_string());
                }
            }
            ImageMetadata {
                width: derived.width,
                height: derived.height,
                format: derived.format.clone(),
                size_bytes: derived.size_bytes,
                file_datetime: iso_utc(&derived.file_datetime),
                caption: derived.caption.clone(),
                exif: (!derived.exif.is_empty()).then(|| derived.exif.clone()),
            }
        });

        let processed_time = record.processed_at.unwrap_or(record.created_at);

        Self {
            status: record.status,
            data: ImageData {
                image_id: record.id.clone(),
                original_name: record.original_name.clone(),
                processed_at: iso_utc(&processed_time),
                metadata,
                thumbnails,
            },
            error: record.error.clone(),
        }
    }
}

/// Aggregate statistics over all records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Number of records, whatever their status
    pub total: usize,

    /// Records that ended in `failed`
    pub failed: usize,

    /// Percentage of `success` records, e.g. "66.67%"
    pub success_rate: String,

    /// Mean processing duration of successful records, two decimals
    pub average_processing_time_seconds: f64,
}

impl ProcessingStats {
    pub fn from_records(records: &[ImageRecord]) -> Self {
        let total = records.len();
        let failed = records
            .iter()
            .filter(|r| r.status == ImageStatus::Failed)
            .count();
        let durations: Vec<f64> = records
            .iter()
            .filter(|r| r.status == ImageStatus::Success)
            .filter_map(|r| r.processing_duration_seconds)
            .collect();
        let succeeded = records
            .iter()
            .filter(|r| r.status == ImageStatus::Success)
            .count();

        let rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64 * 100.0
        };
        let average = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        Self {
            total,
            failed,
            success_rate: format!("{rate:.2}%"),
            average_processing_time_seconds: (average * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record(id: &str) -> ImageRecord {
        let created = Utc.with_ymd_and_hms(2026, 2, 21, 10, 0, 0).unwrap();
        ImageRecord::new(id, "photo.jpg", format!("/data/originals/{id}.jpg"), created)
    }

    fn sample_derived() -> DerivedFields {
        let mut exif = ExifData::default();
        exif.tags.insert("Make".into(), ExifValue::text("TestCamera"));
        exif.tags.insert("Orientation".into(), ExifValue::integer(1));
        DerivedFields {
            width: 640,
            height: 480,
            format: "jpg".to_string(),
            size_bytes: 2048,
            file_datetime: Utc.with_ymd_and_hms(2026, 2, 21, 9, 59, 55).unwrap(),
            caption: "A moderately lit landscape JPEG image with resolution 640x480.".into(),
            exif,
            small_thumbnail_path: PathBuf::from("/data/thumbnails/small/img1.jpg"),
            medium_thumbnail_path: PathBuf::from("/data/thumbnails/medium/img1.jpg"),
        }
    }

    #[test]
    fn test_new_record_is_processing_without_derived_fields() {
        let record = sample_record("img1");
        assert_eq!(record.status, ImageStatus::Processing);
        assert!(record.derived.is_none());
        assert!(record.processed_at.is_none());
        assert!(record.thumbnail_path(ThumbnailSize::Small).is_none());
    }

    #[test]
    fn test_failure_clears_derived_and_sets_error() {
        let now = Utc::now();
        let record = sample_record("img1").into_failure("boom", now, 0.25);
        assert_eq!(record.status, ImageStatus::Failed);
        assert!(record.is_terminal());
        assert!(record.derived.is_none());
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.processing_duration_seconds, Some(0.25));
    }

    #[test]
    fn test_success_populates_everything() {
        let record = sample_record("img1").into_success(sample_derived(), Utc::now(), 0.5);
        assert_eq!(record.status, ImageStatus::Success);
        assert!(record.error.is_none());
        assert_eq!(
            record.thumbnail_path(ThumbnailSize::Medium),
            Some(Path::new("/data/thumbnails/medium/img1.jpg"))
        );
    }

    #[test]
    fn test_thumbnail_size_parse() {
        assert_eq!("small".parse::<ThumbnailSize>(), Ok(ThumbnailSize::Small));
        assert_eq!("MEDIUM".parse::<ThumbnailSize>(), Ok(ThumbnailSize::Medium));
        assert!("large".parse::<ThumbnailSize>().is_err());
    }

    #[test]
    fn test_exif_serializes_flat_with_nested_gps() {
        let mut exif = ExifData::default();
        exif.tags.insert("Model".into(), ExifValue::text("Model X"));
        exif.tags.insert("XResolution".into(), ExifValue::text("72"));
        let mut gps = BTreeMap::new();
        gps.insert("GPSLatitudeRef".into(), ExifValue::text("N"));
        exif.gps = Some(gps);

        let json = serde_json::to_value(&exif).unwrap();
        assert_eq!(json["Model"], "Model X");
        assert_eq!(json["GPSInfo"]["GPSLatitudeRef"], "N");

        let parsed: ExifData = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, exif);
    }

    #[test]
    fn test_exif_without_gps_has_no_gps_key() {
        let mut exif = ExifData::default();
        exif.tags.insert("ISOSpeed".into(), ExifValue::integer(200));
        let json = serde_json::to_string(&exif).unwrap();
        assert!(!json.contains("GPSInfo"));
        assert!(json.contains("\"ISOSpeed\":200"));
    }

    #[test]
    fn test_non_finite_float_becomes_text() {
        assert_eq!(ExifValue::float(f64::NAN), ExifValue::text("NaN"));
        assert!(matches!(ExifValue::float(2.5), ExifValue::Number(_)));
    }

    #[test]
    fn test_status_parses_from_its_name() {
        for status in [ImageStatus::Processing, ImageStatus::Success, ImageStatus::Failed] {
            assert_eq!(status.as_str().parse::<ImageStatus>(), Ok(status));
        }
        assert!("done".parse::<ImageStatus>().is_err());
    }

    #[test]
    fn test_response_while_processing() {
        let record = sample_record("img1");
        let response = ImageResponse::from_record(&record);
        assert_eq!(response.status, ImageStatus::Processing);
        assert!(response.data.metadata.is_none());
        assert!(response.data.thumbnails.is_empty());
        assert_eq!(response.data.processed_at, "2026-02-21T10:00:00Z");
    }

    #[test]
    fn test_response_after_success() {
        let processed = Utc.with_ymd_and_hms(2026, 2, 21, 10, 0, 2).unwrap();
        let record = sample_record("img1").into_success(sample_derived(), processed, 2.0);
        let response = ImageResponse::from_record(&record);

        let metadata = response.data.metadata.as_ref().unwrap();
        assert_eq!(metadata.format, "jpg");
        assert_eq!(metadata.file_datetime, "2026-02-21T09:59:55Z");
        assert_eq!(
            response.data.thumbnails[&ThumbnailSize::Small],
            "/data/thumbnails/small/img1.jpg"
        );
        assert_eq!(response.data.processed_at, "2026-02-21T10:00:02Z");
    }

    #[test]
    fn test_stats_empty() {
        let stats = ProcessingStats::from_records(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.success_rate, "0.00%");
        assert_eq!(stats.average_processing_time_seconds, 0.0);
    }

    #[test]
    fn test_stats_mixed() {
        let now = Utc::now();
        let records = vec![
            sample_record("a").into_success(sample_derived(), now, 0.5),
            sample_record("b").into_success(sample_derived(), now, 0.25),
            sample_record("c").into_failure("broken", now, 9.0),
        ];
        let stats = ProcessingStats::from_records(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.success_rate, "66.67%");
        // Failed durations are excluded from the mean
        assert_eq!(stats.average_processing_time_seconds, 0.38);
    }
}
