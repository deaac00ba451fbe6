pub mod record_store;
pub mod token_store;

use std::io::Write;
use std::path::Path;

use crate::error::{SyncError, SyncResult};

/// Replace `path` with `bytes` without ever exposing a partly written file:
/// write a temp file in the same directory, fsync it, then rename it over `path`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .map_err(|error| SyncError::file_access(directory, error))?;

    let mut file = tempfile::NamedTempFile::new_in(directory)
        .map_err(|error| SyncError::file_access(directory, error))?;
    file.write_all(bytes)
        .map_err(|error| SyncError::file_access(file.path(), error))?;
    file.as_file()
        .sync_all()
        .map_err(|error| SyncError::file_access(file.path(), error))?;

    // On failure the temp file is dropped and removed; the target is untouched
    file.persist(path)
        .map_err(|error| SyncError::file_access(path, error.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
