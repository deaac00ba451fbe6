use serde_json::Map;
use tempfile::TempDir;

use crate::config::Config;
use crate::spotify_api::types::{
    Authorization, Batch, Credentials, PlayRecord, PlayedArtist, PlayedTrack,
};

pub fn play(played_at: &str, name: &str) -> PlayRecord {
    play_by(played_at, name, "Artist1")
}

pub fn play_by(played_at: &str, name: &str, artist: &str) -> PlayRecord {
    PlayRecord {
        played_at: played_at.to_string(),
        track: PlayedTrack {
            name: name.to_string(),
            artists: vec![PlayedArtist {
                name: artist.to_string(),
                extra: Map::new(),
            }],
            extra: Map::new(),
        },
        extra: Map::new(),
    }
}

pub fn batch_of(items: Vec<PlayRecord>) -> Batch {
    Batch {
        items,
        extra: Map::new(),
    }
}

pub fn token_bundle(access_token: &str, refresh_token: Option<&str>) -> Authorization {
    Authorization {
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        refresh_token: refresh_token.map(str::to_string),
        scope: "user-read-recently-played".to_string(),
        extra: Map::new(),
    }
}

/// Scratch directory with a config rooted in it and the credentials file in place.
pub fn scratch_config() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_root(dir.path());

    let credentials = Credentials {
        client_id: "a".into(),
        client_secret: "b".into(),
        authorization_code: "c".into(),
    };
    std::fs::write(
        config.credentials_path(),
        serde_json::to_string_pretty(&credentials).unwrap(),
    )
    .unwrap();

    (dir, config)
}
