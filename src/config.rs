use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "played-history";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding client_id, client_secret and authorization_code
    credentials: String,
    /// JSON file holding the last token bundle
    authorization: String,
    /// Directory for latest.json and the timestamped snapshots
    data_directory: String,
    /// Redirect URI registered with the Spotify app
    pub redirect_uri: String,
    pub spotify: SpotifyConfig,
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join("data"))
            .unwrap_or_else(|| PathBuf::from("data"));

        Self {
            credentials: config_dir.join("credentials.json").display().to_string(),
            authorization: config_dir.join("authorization.json").display().to_string(),
            data_directory: data_dir.display().to_string(),
            redirect_uri: "http://localhost:8888/callback".to_string(),
            spotify: SpotifyConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub accounts_url: String,
    pub api_url: String,
    /// Unset means whatever the HTTP client defaults to
    pub request_timeout_secs: Option<u64>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl SpotifyConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page through full 50-item responses instead of taking one page
    pub paginate: bool,
    pub max_pages: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            paginate: false,
            max_pages: 20,
        }
    }
}

impl SyncConfig {
    pub fn max_pages(&self) -> Option<usize> {
        self.paginate.then_some(self.max_pages)
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load the default config file, falling back to built-in defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the default config file if there isn't one yet. Returns its path.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| color_eyre::eyre::eyre!("No config directory on this platform"))?;

        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.expand_path(&self.credentials)
    }

    pub fn authorization_path(&self) -> PathBuf {
        self.expand_path(&self.authorization)
    }

    pub fn data_directory_path(&self) -> PathBuf {
        self.expand_path(&self.data_directory)
    }

    /// Point every local file at `root`.
    #[cfg(test)]
    pub fn with_root(mut self, root: &Path) -> Self {
        self.credentials = root.join("credentials.json").display().to_string();
        self.authorization = root.join("authorization.json").display().to_string();
        self.data_directory = root.join("data").display().to_string();
        self
    }
}
