use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::spotify_api::types::{Authorization, Credentials};
use crate::store::write_atomically;

/// Read the client credentials. They are provisioned by hand and never written here.
pub fn load_credentials(path: &Path) -> SyncResult<Credentials> {
    let contents =
        std::fs::read_to_string(path).map_err(|error| SyncError::file_access(path, error))?;
    serde_json::from_str(&contents).map_err(|error| SyncError::malformed_file(path, error))
}

/// The persisted token bundle. Its absence means this is the first run.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> SyncResult<Option<Authorization>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|error| SyncError::file_access(&self.path, error))?;
        let authorization = serde_json::from_str(&contents)
            .map_err(|error| SyncError::malformed_file(&self.path, error))?;

        Ok(Some(authorization))
    }

    /// Overwrite the stored bundle. The old file stays intact if this fails.
    pub fn save(&self, authorization: &Authorization) -> SyncResult<()> {
        let contents = serde_json::to_vec_pretty(authorization)
            .map_err(|error| SyncError::file_access(&self.path, error.into()))?;
        write_atomically(&self.path, &contents)?;

        tracing::debug!("Saved authorization to {}", self.path.display());
        Ok(())
    }
}
