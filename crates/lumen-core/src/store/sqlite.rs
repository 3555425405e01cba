//! SQLite-backed record store.
//!
//! Each operation opens its own connection on the blocking pool, so any number
//! of stores (and processes) can share one database file. Every transition is
//! a single-row statement; SQLite serialises concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::RecordStore;
use crate::error::StoreError;
use crate::types::{DerivedFields, ImageRecord, ImageStatus};

const SELECT_COLUMNS: &str = "SELECT id, original_name, original_path, status, created_at, \
     derived, processed_at, processing_duration_seconds, error FROM images";

/// Record store persisted in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and make sure the schema exists.
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let store = Self { db_path };
        store.with_connection(init_schema).await?;
        tracing::debug!("Opened record store {:?}", store.db_path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` against a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&db_path)?;
            f(&conn)
        })
        .await?
    }
}

/// Open a connection with the concurrency settings every operation relies on.
fn connect(db_path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        PRAGMA busy_timeout = 30000;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
    "#,
    )?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            original_name TEXT NOT NULL,
            original_path TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            derived TEXT,
            processed_at TEXT,
            processing_duration_seconds REAL,
            error TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_images_created_at ON images(created_at DESC);
    "#,
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            message: format!("bad timestamp {value:?}: {e}"),
        })
}

/// Raw column values, converted to an `ImageRecord` outside the row callback.
struct ImageRow {
    id: String,
    original_name: String,
    original_path: String,
    status: String,
    created_at: String,
    derived: Option<String>,
    processed_at: Option<String>,
    processing_duration_seconds: Option<f64>,
    error: Option<String>,
}

impl ImageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            original_name: row.get("original_name")?,
            original_path: row.get("original_path")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            derived: row.get("derived")?,
            processed_at: row.get("processed_at")?,
            processing_duration_seconds: row.get("processing_duration_seconds")?,
            error: row.get("error")?,
        })
    }

    fn into_record(self) -> Result<ImageRecord, StoreError> {
        let status: ImageStatus = self.status.parse().map_err(|message| StoreError::Corrupt {
            id: self.id.clone(),
            message,
        })?;
        let derived = self
            .derived
            .as_deref()
            .map(serde_json::from_str::<DerivedFields>)
            .transpose()?;
        let processed_at = self
            .processed_at
            .as_deref()
            .map(|value| parse_datetime(&self.id, value))
            .transpose()?;

        Ok(ImageRecord {
            created_at: parse_datetime(&self.id, &self.created_at)?,
            id: self.id,
            original_name: self.original_name,
            original_path: PathBuf::from(self.original_path),
            status,
            derived,
            processed_at,
            processing_duration_seconds: self.processing_duration_seconds,
            error: self.error,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, record: ImageRecord) -> Result<(), StoreError> {
        self.with_connection(move |conn| {
            let derived = record
                .derived
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let inserted = conn.execute(
                r#"
                INSERT INTO images (id, original_name, original_path, status, created_at,
                                    derived, processed_at, processing_duration_seconds, error)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO NOTHING
                "#,
                params![
                    record.id,
                    record.original_name,
                    record.original_path.to_string_lossy().into_owned(),
                    record.status.as_str(),
                    format_datetime(&record.created_at),
                    derived,
                    record.processed_at.as_ref().map(format_datetime),
                    record.processing_duration_seconds,
                    record.error,
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::Duplicate(record.id));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![id],
                    ImageRow::from_row,
                )
                .optional()?;
            row.map(ImageRow::into_record).transpose()
        })
        .await
    }

    /// Writes the mutable columns only; identity and submission fields are
    /// fixed at `create`.
    async fn update(&self, record: ImageRecord) -> Result<(), StoreError> {
        self.with_connection(move |conn| {
            let derived = record
                .derived
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let updated = conn.execute(
                r#"
                UPDATE images
                SET status = ?2,
                    derived = ?3,
                    processed_at = ?4,
                    processing_duration_seconds = ?5,
                    error = ?6
                WHERE id = ?1
                "#,
                params![
                    record.id,
                    record.status.as_str(),
                    derived,
                    record.processed_at.as_ref().map(format_datetime),
                    record.processing_duration_seconds,
                    record.error,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::Missing(record.id));
            }
            Ok(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY created_at DESC, id ASC"
            ))?;
            let rows = stmt
                .query_map([], ImageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(ImageRow::into_record).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExifData, ExifValue};
    use chrono::Duration;

    fn derived(dir: &Path) -> DerivedFields {
        let mut exif = ExifData::default();
        exif.tags.insert("Make".into(), ExifValue::text("TestCamera"));
        exif.tags.insert("FNumber".into(), ExifValue::float(2.8));
        DerivedFields {
            width: 4,
            height: 3,
            format: "png".into(),
            size_bytes: 99,
            file_datetime: Utc::now(),
            caption: "A dark landscape PNG image with resolution 4x3.".into(),
            exif,
            small_thumbnail_path: dir.join("s.jpg"),
            medium_thumbnail_path: dir.join("m.jpg"),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("lumen.db");
        let derived = derived(dir.path());

        {
            let store = SqliteStore::open(&path).await.unwrap();
            let record = ImageRecord::new("img1", "a.png", "/x/a.png", Utc::now());
            store.create(record.clone()).await.unwrap();
            store
                .create(ImageRecord::new("img2", "b.png", "/x/b.png", Utc::now()))
                .await
                .unwrap();
            store
                .update(record.into_success(derived.clone(), Utc::now(), 0.2))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).await.unwrap();
        let record = reopened.get("img1").await.unwrap().unwrap();
        assert_eq!(record.status, ImageStatus::Success);
        assert_eq!(record.derived, Some(derived));
        assert_eq!(record.processing_duration_seconds, Some(0.2));
        assert_eq!(reopened.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("lumen.db")).await.unwrap();
        let record = ImageRecord::new("img1", " spaced name.jpg ", "/x/a.jpg", Utc::now());
        store.create(record.clone()).await.unwrap();
        assert_eq!(store.get("img1").await.unwrap(), Some(record.clone()));

        let failed = record.into_failure("broken", Utc::now(), 0.125);
        store.update(failed.clone()).await.unwrap();
        assert_eq!(store.get("img1").await.unwrap(), Some(failed));
    }

    #[tokio::test]
    async fn test_independent_handles_share_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumen.db");
        let a = SqliteStore::open(&path).await.unwrap();
        let b = SqliteStore::open(&path).await.unwrap();

        a.create(ImageRecord::new("imgA", "a.jpg", "/a", Utc::now()))
            .await
            .unwrap();
        b.create(ImageRecord::new("imgB", "b.jpg", "/b", Utc::now()))
            .await
            .unwrap();

        let reopened = SqliteStore::open(&path).await.unwrap();
        let mut ids: Vec<_> = reopened
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["imgA", "imgB"]);

        // A write through one handle is visible through the other.
        assert!(b.get("imgA").await.unwrap().is_some());
        assert!(matches!(
            b.create(ImageRecord::new("imgA", "dup.jpg", "/dup", Utc::now()))
                .await,
            Err(StoreError::Duplicate(ref id)) if id == "imgA"
        ));
    }

    #[tokio::test]
    async fn test_update_leaves_submission_fields_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("lumen.db")).await.unwrap();
        let record = ImageRecord::new("img1", "a.jpg", "/x/a.jpg", Utc::now());
        store.create(record.clone()).await.unwrap();

        let mut tampered = record.clone().into_failure("broken", Utc::now(), 0.1);
        tampered.original_name = "renamed.jpg".into();
        store.update(tampered).await.unwrap();

        let stored = store.get("img1").await.unwrap().unwrap();
        assert_eq!(stored.original_name, "a.jpg");
        assert_eq!(stored.status, ImageStatus::Failed);
    }

    #[tokio::test]
    async fn test_update_missing_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("lumen.db")).await.unwrap();
        let record = ImageRecord::new("ghost", "a.jpg", "/tmp/a.jpg", Utc::now());
        assert!(matches!(
            store.update(record).await,
            Err(StoreError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_across_precision() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("lumen.db")).await.unwrap();
        let base = DateTime::parse_from_rfc3339("2026-02-21T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store
            .create(ImageRecord::new("whole", "a.jpg", "/a", base))
            .await
            .unwrap();
        store
            .create(ImageRecord::new(
                "later",
                "b.jpg",
                "/b",
                base + Duration::milliseconds(500),
            ))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["later", "whole"]);
    }

    #[tokio::test]
    async fn test_unknown_status_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumen.db");
        let store = SqliteStore::open(&path).await.unwrap();
        store
            .create(ImageRecord::new("img1", "a.jpg", "/a", Utc::now()))
            .await
            .unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE images SET status = 'done' WHERE id = 'img1'", [])
            .unwrap();

        assert!(matches!(
            store.get("img1").await,
            Err(StoreError::Corrupt { ref id, .. }) if id == "img1"
        ));
    }
}
