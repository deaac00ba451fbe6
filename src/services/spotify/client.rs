use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::config::SpotifyConfig;
use crate::error::SyncResult;
use crate::ports::spotify::SpotifyApi;
use crate::spotify_api::auth::{exchange_code_for_token, refresh_access_token};
use crate::spotify_api::client::{get_recently_played, get_recently_played_pages};
use crate::spotify_api::types::{Authorization, Batch};

pub struct SpotifyHttpAdapter {
    client: Client,
    accounts_url: String,
    api_url: String,
    /// `Some(max_pages)` turns on paging through full pages.
    max_pages: Option<usize>,
}

impl SpotifyHttpAdapter {
    pub fn new(config: &SpotifyConfig, max_pages: Option<usize>) -> SyncResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            accounts_url: config.accounts_url.clone(),
            api_url: config.api_url.clone(),
            max_pages,
        })
    }
}

#[async_trait::async_trait]
impl SpotifyApi for SpotifyHttpAdapter {
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        authorization_code: &str,
        redirect_uri: &str,
    ) -> SyncResult<Authorization> {
        exchange_code_for_token(
            &self.client,
            &self.accounts_url,
            client_id,
            client_secret,
            authorization_code,
            redirect_uri,
        )
        .await
    }

    async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> SyncResult<Authorization> {
        refresh_access_token(
            &self.client,
            &self.accounts_url,
            client_id,
            client_secret,
            refresh_token,
        )
        .await
    }

    async fn fetch_recent(
        &self,
        access_token: &str,
        after: Option<DateTime<Utc>>,
    ) -> SyncResult<Batch> {
        match self.max_pages {
            Some(max_pages) => {
                get_recently_played_pages(&self.client, &self.api_url, access_token, after, max_pages)
                    .await
            }
            None => get_recently_played(&self.client, &self.api_url, access_token, after).await,
        }
    }
}
