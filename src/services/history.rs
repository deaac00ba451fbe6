use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};
use crate::spotify_api::types::{format_local, parse_played_at};
use crate::store::record_store::RecordStore;

/// Keys dropped from every flattened play.
const STRIPPED_KEYS: [&str; 3] = [
    "track.available_markets",
    "track.context",
    "track.disc_number",
];

/// One stored play with nested objects collapsed into dotted keys
/// (`track.name`, `track.artists`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct FlatPlay(pub Map<String, Value>);

impl FlatPlay {
    pub fn played_at(&self) -> &str {
        self.0
            .get("played_at")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn str_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    fn first_artist(&self) -> &str {
        self.0
            .get("track.artists")
            .and_then(|artists| artists.get(0))
            .and_then(|artist| artist.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown Artist")
    }

    /// `<local time> - <first artist> - <title>`
    pub fn line(&self) -> String {
        format!(
            "{} - {} - {}",
            self.str_field("track.played_at_local"),
            self.first_artist(),
            self.str_field("track.name")
        )
    }
}

/// Every play across all stored files, one entry per `played_at`, oldest first.
pub fn load_history(store: &RecordStore) -> SyncResult<Vec<FlatPlay>> {
    let mut seen = HashSet::new();
    let mut plays = Vec::new();

    for path in store.json_files()? {
        let contents =
            std::fs::read_to_string(&path).map_err(|error| SyncError::file_access(&path, error))?;
        let document: Value = serde_json::from_str(&contents)
            .map_err(|error| SyncError::malformed_file(&path, error))?;

        let Some(items) = document.get("items").and_then(Value::as_array) else {
            tracing::warn!("Skipping {}: no items array", path.display());
            continue;
        };

        for item in items {
            let Some(played_at) = item.get("played_at").and_then(Value::as_str) else {
                continue;
            };
            if !seen.insert(played_at.to_string()) {
                continue;
            }
            plays.push(flatten_play(item.clone()));
        }
    }

    plays.sort_by(|a, b| {
        parse_played_at(a.played_at())
            .cmp(&parse_played_at(b.played_at()))
            .then_with(|| a.played_at().cmp(b.played_at()))
    });

    tracing::debug!("Loaded {} unique plays", plays.len());
    Ok(plays)
}

fn flatten_play(mut item: Value) -> FlatPlay {
    let local = item
        .get("played_at")
        .and_then(Value::as_str)
        .and_then(parse_played_at)
        .map(format_local)
        .unwrap_or_default();

    if let Some(track) = item.get_mut("track").and_then(Value::as_object_mut) {
        track.remove("album");
        track.insert("played_at_local".to_string(), Value::String(local));
    }

    let mut flat = Map::new();
    if let Value::Object(object) = item {
        flatten_into(&mut flat, None, object);
    }
    for key in STRIPPED_KEYS {
        flat.remove(key);
    }

    FlatPlay(flat)
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, object: Map<String, Value>) {
    for (key, value) in object {
        let key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(flat, Some(&key), nested),
            leaf => {
                flat.insert(key, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch_of, play, play_by};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_history_dedups_across_snapshots_and_sorts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        store
            .persist_batch(
                &batch_of(vec![
                    play_by("2024-01-01T10:05:00Z", "Song2", "Artist2"),
                    play_by("2024-01-01T10:00:00Z", "Song1", "Artist1"),
                ]),
                Utc.timestamp_millis_opt(1000).unwrap(),
            )
            .unwrap();
        // A stale pointer makes the next run refetch overlapping plays
        store
            .persist_batch(
                &batch_of(vec![
                    play_by("2024-01-01T11:00:00Z", "Song3", "Artist3"),
                    play_by("2024-01-01T10:05:00Z", "Song2", "Artist2"),
                ]),
                Utc.timestamp_millis_opt(2000).unwrap(),
            )
            .unwrap();

        let history = load_history(&store).unwrap();

        let played: Vec<_> = history.iter().map(FlatPlay::played_at).collect();
        assert_eq!(
            played,
            vec![
                "2024-01-01T10:00:00Z",
                "2024-01-01T10:05:00Z",
                "2024-01-01T11:00:00Z"
            ]
        );

        let line = history[0].line();
        assert!(line.ends_with(" - Artist1 - Song1"), "unexpected line: {}", line);
        assert!(line.contains("2024"));
    }

    #[test]
    fn test_flatten_strips_fields() {
        let flat = flatten_play(json!({
            "played_at": "2024-01-01T10:00:00Z",
            "context": {"type": "playlist", "uri": "spotify:playlist:1"},
            "track": {
                "name": "Song1",
                "album": {"name": "Album"},
                "artists": [{"name": "Artist1"}],
                "available_markets": ["US"],
                "disc_number": 1,
                "external_urls": {"spotify": "https://open.spotify.com/track/1"}
            }
        }));

        let mut keys: Vec<_> = flat.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "context.type",
                "context.uri",
                "played_at",
                "track.artists",
                "track.external_urls.spotify",
                "track.name",
                "track.played_at_local",
            ]
        );
        assert_eq!(flat.first_artist(), "Artist1");
    }

    #[test]
    fn test_history_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("missing"));

        assert!(load_history(&store).unwrap().is_empty());
    }

    #[test]
    fn test_history_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latest.json"), "{").unwrap();

        let err = load_history(&RecordStore::new(dir.path())).unwrap_err();
        assert!(matches!(err, SyncError::MalformedResponse { .. }));
    }
}
