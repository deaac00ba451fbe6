use chrono::{DateTime, Utc};

use crate::error::SyncResult;
use crate::spotify_api::types::{Authorization, Batch};

/// Port trait wrapping the Spotify endpoints the sync depends on.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyApi: Send + Sync {
    /// `grant_type=authorization_code`. Only used when no authorization is stored yet.
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        authorization_code: &str,
        redirect_uri: &str,
    ) -> SyncResult<Authorization>;

    /// `grant_type=refresh_token`. The returned bundle may lack a refresh token.
    async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> SyncResult<Authorization>;

    /// Recently played tracks, restricted to plays after `after` when given.
    async fn fetch_recent(
        &self,
        access_token: &str,
        after: Option<DateTime<Utc>>,
    ) -> SyncResult<Batch>;
}
