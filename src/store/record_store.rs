use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{SyncError, SyncResult};
use crate::spotify_api::types::{Batch, format_local, parse_played_at};
use crate::store::write_atomically;

pub const LATEST_FILE_NAME: &str = "latest.json";
const SNAPSHOT_SUFFIX: &str = "-recently-played.json";

/// `played_at` of the newest stored play; the lower bound for the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub played_at: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_local(self.timestamp))
    }
}

/// Paths written by [`RecordStore::persist_batch`].
#[derive(Debug, Clone)]
pub struct PersistedBatch {
    pub snapshot: PathBuf,
    pub latest: PathBuf,
}

/// Append-only snapshot files plus the `latest.json` pointer, all in one directory.
pub struct RecordStore {
    directory: PathBuf,
}

impl RecordStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.directory.join(LATEST_FILE_NAME)
    }

    pub fn snapshot_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.directory
            .join(format!("{}{}", at.timestamp_millis(), SNAPSHOT_SUFFIX))
    }

    /// Read the first item of `latest.json`. Service order is newest first, so
    /// index 0 is the newest play. Never writes anything.
    pub fn resolve_watermark(&self) -> SyncResult<Option<Watermark>> {
        let path = self.latest_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|error| SyncError::file_access(&path, error))?;
        let batch: Batch = serde_json::from_str(&contents)
            .map_err(|error| SyncError::malformed_file(&path, error))?;

        let Some(first) = batch.items.first() else {
            return Ok(None);
        };

        let timestamp =
            parse_played_at(&first.played_at).ok_or_else(|| SyncError::MalformedResponse {
                context: path.display().to_string(),
                body: format!("invalid played_at: {}", first.played_at),
            })?;

        Ok(Some(Watermark {
            played_at: first.played_at.clone(),
            timestamp,
        }))
    }

    /// Write serialized batch `bytes` to a new `<epoch millis>-recently-played.json`.
    pub fn write_snapshot(&self, bytes: &[u8], at: DateTime<Utc>) -> SyncResult<PathBuf> {
        let path = self.snapshot_path(at);
        write_atomically(&path, bytes)?;
        Ok(path)
    }

    /// Replace `latest.json` with serialized batch `bytes`.
    pub fn write_latest(&self, bytes: &[u8]) -> SyncResult<PathBuf> {
        let path = self.latest_path();
        write_atomically(&path, bytes)?;
        Ok(path)
    }

    /// Serialize once and write the same bytes to the snapshot and to `latest.json`,
    /// snapshot first. A failure between the two leaves `latest.json` one batch behind.
    pub fn persist_batch(&self, batch: &Batch, at: DateTime<Utc>) -> SyncResult<PersistedBatch> {
        let bytes = serialize(batch, &self.latest_path())?;

        let snapshot = self.write_snapshot(&bytes, at)?;
        let latest = self.write_latest(&bytes)?;

        Ok(PersistedBatch { snapshot, latest })
    }

    /// Every `*.json` file in the data directory, sorted by name.
    pub fn json_files(&self) -> SyncResult<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.directory)
            .map_err(|error| SyncError::file_access(&self.directory, error))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|error| SyncError::file_access(&self.directory, error))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }
}

fn serialize(batch: &Batch, path: &Path) -> SyncResult<Vec<u8>> {
    serde_json::to_vec_pretty(batch).map_err(|error| SyncError::file_access(path, error.into()))
}
