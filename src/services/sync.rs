use std::fmt;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::ports::spotify::SpotifyApi;
use crate::spotify_api::types::{Authorization, Batch, Credentials};
use crate::store::record_store::{PersistedBatch, RecordStore, Watermark};
use crate::store::token_store::{TokenStore, load_credentials};

/// Everything a run needs, built once at startup and passed down explicitly.
pub struct SyncContext {
    pub credentials: Credentials,
    pub redirect_uri: String,
    pub token_store: TokenStore,
    pub record_store: RecordStore,
}

impl SyncContext {
    pub fn load(config: &Config) -> SyncResult<Self> {
        Ok(Self {
            credentials: load_credentials(&config.credentials_path())?,
            redirect_uri: config.redirect_uri.clone(),
            token_store: TokenStore::new(config.authorization_path()),
            record_store: RecordStore::new(config.data_directory_path()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Authorizing,
    Resolving,
    Fetching,
    Deciding,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Init => "init",
            SyncState::Authorizing => "authorizing",
            SyncState::Resolving => "resolving",
            SyncState::Fetching => "fetching",
            SyncState::Deciding => "deciding",
            SyncState::Persisting => "persisting",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A run that ended in `Failed`, with the state it was in when the error hit.
#[derive(Debug, thiserror::Error)]
#[error("Sync failed while {state}: {error}")]
pub struct SyncFailure {
    pub state: SyncState,
    #[source]
    pub error: SyncError,
}

impl SyncFailure {
    fn at(state: SyncState) -> impl FnOnce(SyncError) -> SyncFailure {
        move |error| SyncFailure { state, error }
    }
}

/// How a run that reached `Done` ended.
#[derive(Debug)]
pub enum SyncOutcome {
    NoNewPlays {
        watermark: Option<Watermark>,
    },
    Saved {
        count: usize,
        persisted: PersistedBatch,
    },
}

pub struct SyncService<C: SpotifyApi> {
    api: C,
    context: SyncContext,
}

impl<C: SpotifyApi> SyncService<C> {
    pub fn new(api: C, context: SyncContext) -> Self {
        Self { api, context }
    }

    #[cfg(test)]
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    pub async fn run(&self) -> Result<SyncOutcome, SyncFailure> {
        self.run_at(Utc::now()).await
    }

    /// One full pass: Init → Authorizing → Resolving → Fetching → Deciding → Persisting → Done.
    /// `now` names the snapshot file.
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SyncOutcome, SyncFailure> {
        let current = self
            .initialize()
            .await
            .map_err(SyncFailure::at(SyncState::Init))?;

        let authorization = self
            .authorize(current)
            .await
            .map_err(SyncFailure::at(SyncState::Authorizing))?;

        let watermark = self
            .resolve()
            .map_err(SyncFailure::at(SyncState::Resolving))?;

        let batch = self
            .fetch(&authorization.access_token, watermark.as_ref())
            .await
            .map_err(SyncFailure::at(SyncState::Fetching))?;

        tracing::debug!(state = %SyncState::Deciding, items = batch.len());
        if batch.is_empty() {
            match &watermark {
                Some(watermark) => tracing::info!("No new songs have played since {}", watermark),
                None => tracing::info!("No songs have been played recently"),
            }
            return Ok(SyncOutcome::NoNewPlays { watermark });
        }

        let persisted = self
            .persist(&batch, now)
            .map_err(SyncFailure::at(SyncState::Persisting))?;

        tracing::debug!(state = %SyncState::Done);
        Ok(SyncOutcome::Saved {
            count: batch.len(),
            persisted,
        })
    }

    /// Stored authorization, or a first-time code exchange that is saved right away.
    async fn initialize(&self) -> SyncResult<Authorization> {
        tracing::debug!(state = %SyncState::Init);
        if let Some(stored) = self.context.token_store.load()? {
            return Ok(stored);
        }

        tracing::info!("No stored authorization; exchanging the authorization code");
        let credentials = &self.context.credentials;
        let authorization = self
            .api
            .exchange_code(
                &credentials.client_id,
                &credentials.client_secret,
                &credentials.authorization_code,
                &self.context.redirect_uri,
            )
            .await?;

        self.context.token_store.save(&authorization)?;
        Ok(authorization)
    }

    /// Refresh every run; stored access tokens are never trusted.
    async fn authorize(&self, current: Authorization) -> SyncResult<Authorization> {
        tracing::debug!(state = %SyncState::Authorizing);
        let refresh_token = current
            .refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SyncError::MissingRefreshToken {
                path: self.context.token_store.path().to_path_buf(),
            })?;

        let credentials = &self.context.credentials;
        let refreshed = self
            .api
            .refresh(
                &credentials.client_id,
                &credentials.client_secret,
                &refresh_token,
            )
            .await?
            .merge_refresh(&refresh_token);

        self.context.token_store.save(&refreshed)?;
        Ok(refreshed)
    }

    fn resolve(&self) -> SyncResult<Option<Watermark>> {
        tracing::debug!(state = %SyncState::Resolving);
        self.context.record_store.resolve_watermark()
    }

    async fn fetch(&self, access_token: &str, watermark: Option<&Watermark>) -> SyncResult<Batch> {
        tracing::debug!(state = %SyncState::Fetching);
        match watermark {
            Some(watermark) => tracing::info!("Getting tracks after {}", watermark),
            None => tracing::info!("Getting the most recently played tracks"),
        }

        self.api
            .fetch_recent(access_token, watermark.map(|w| w.timestamp))
            .await
    }

    fn persist(&self, batch: &Batch, now: DateTime<Utc>) -> SyncResult<PersistedBatch> {
        tracing::debug!(state = %SyncState::Persisting);
        tracing::info!("Saving songs to data folder.");
        let persisted = self.context.record_store.persist_batch(batch, now)?;
        tracing::info!(
            "Saved {} plays to {}",
            batch.len(),
            persisted.snapshot.display()
        );
        Ok(persisted)
    }
}
