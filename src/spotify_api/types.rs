use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client credentials provisioned out of band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_code: String,
}

/// Spotify OAuth token response, persisted as-is between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Authorization {
    /// Spotify does not always rotate the refresh token, so keep the one we
    /// already have when the response leaves it out.
    pub fn merge_refresh(mut self, previous_refresh_token: &str) -> Self {
        let missing = self
            .refresh_token
            .as_deref()
            .is_none_or(|token| token.is_empty());
        if missing {
            self.refresh_token = Some(previous_refresh_token.to_string());
        }
        self
    }
}

/// One page of the recently-played feed.
///
/// Fields we don't model (`next`, `cursors`, `href`, ...) are carried in
/// `extra` so the file on disk is the document the service sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub items: Vec<PlayRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub played_at: String,
    pub track: PlayedTrack,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayRecord {
    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        parse_played_at(&self.played_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayedTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<PlayedArtist>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayedArtist {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse an ISO 8601 `played_at` value (e.g. `2024-01-01T10:00:00.123Z`).
pub fn parse_played_at(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Local wall-clock rendering used in logs and reports, e.g. `1/1/2024, 10:00:00 AM`.
pub fn format_local(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}
