use std::path::PathBuf;

/// Everything that can abort a sync run. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The token endpoint answered without an access token (code invalid,
    /// expired or already consumed, or a revoked refresh token).
    #[error("Token endpoint did not return an access token: {body}")]
    AuthExchange { body: String },
    #[error("Failed to send http request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed response from {context}: {body}")]
    MalformedResponse { context: String, body: String },
    #[error("Failed to access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Stored authorization at {} has no refresh token", .path.display())]
    MissingRefreshToken { path: PathBuf },
}

impl SyncError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// A local file that exists but does not hold the JSON we expect.
    pub fn malformed_file(path: &std::path::Path, error: serde_json::Error) -> Self {
        Self::MalformedResponse {
            context: path.display().to_string(),
            body: error.to_string(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
