use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::error::{SyncError, SyncResult};
use crate::spotify_api::types::Batch;

pub const RECENTLY_PLAYED_PATH: &str = "/v1/me/player/recently-played";

/// Largest page the recently-played endpoint will return.
pub const PAGE_LIMIT: usize = 50;

/// Fetch one page of the listening history, optionally only plays after `after`.
pub async fn get_recently_played(
    client: &Client,
    api_url: &str,
    access_token: &str,
    after: Option<DateTime<Utc>>,
) -> SyncResult<Batch> {
    let url = format!("{}{}", api_url.trim_end_matches('/'), RECENTLY_PLAYED_PATH);

    let mut query = vec![("limit", PAGE_LIMIT.to_string())];
    if let Some(after) = after {
        query.insert(0, ("after", after.timestamp_millis().to_string()));
    }

    let response = client
        .get(&url)
        .bearer_auth(access_token)
        .query(&query)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(SyncError::MalformedResponse {
            context: format!("{} ({})", url, status),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|_| SyncError::MalformedResponse { context: url, body })
}

/// Keep requesting pages while they come back full, moving `after` forward to
/// the newest play seen so far. Stops after `max_pages` requests.
pub async fn get_recently_played_pages(
    client: &Client,
    api_url: &str,
    access_token: &str,
    after: Option<DateTime<Utc>>,
    max_pages: usize,
) -> SyncResult<Batch> {
    let mut pages = Vec::new();
    let mut cursor = after;

    for page_number in 0..max_pages.max(1) {
        let page = get_recently_played(client, api_url, access_token, cursor).await?;
        let full = page.len() == PAGE_LIMIT;
        let newest = page.items.iter().filter_map(|item| item.played_at()).max();
        pages.push(page);

        match newest {
            Some(newest) if full && cursor.is_none_or(|c| newest > c) => cursor = Some(newest),
            _ => break,
        }

        if page_number + 1 == max_pages {
            tracing::warn!(
                "Stopped paging recently played after {} pages; older plays may be missing",
                max_pages
            );
        }
    }

    Ok(merge_pages(pages))
}

/// Combine pages into one batch, newest first, dropping repeated `played_at`s.
///
/// Top-level fields of the first page (`cursors`, `href`, ...) are kept.
pub fn merge_pages(pages: Vec<Batch>) -> Batch {
    let mut pages = pages.into_iter();
    let Some(mut merged) = pages.next() else {
        return Batch::default();
    };

    for page in pages {
        merged.items.extend(page.items);
    }

    let mut seen = HashSet::new();
    merged.items.retain(|item| seen.insert(item.played_at.clone()));
    merged
        .items
        .sort_by(|a, b| b.played_at().cmp(&a.played_at()));

    merged
}
