//! Configuration file handling for tweetstream

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tweetstream_client::{Credentials, StreamConfig};

/// Contents of `config.toml`
///
/// ```toml
/// [stream]
/// idle_timeout_secs = 90
///
/// [stream.backoff]
/// max_retries = 10
///
/// [auth]
/// type = "oauth"
/// consumer_key = "..."
/// consumer_secret = "..."
/// access_token = "..."
/// access_token_secret = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Client settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Credentials
    pub auth: Option<Credentials>,
}

/// Credentials given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct AuthArgs {
    pub username: Option<String>,
    pub password: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
}

impl AuthArgs {
    /// Credentials described by these arguments, if any were given
    ///
    /// OAuth wins when both kinds are present.
    pub fn credentials(&self) -> Option<Credentials> {
        let oauth = [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ];
        if oauth.iter().any(|field| field.is_some()) {
            let value = |field: &Option<String>| field.clone().unwrap_or_default();
            return Some(Credentials::oauth(
                value(&self.consumer_key),
                value(&self.consumer_secret),
                value(&self.access_token),
                value(&self.access_token_secret),
            ));
        }

        if self.username.is_some() || self.password.is_some() {
            return Some(Credentials::basic(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            ));
        }

        None
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("tweetstream");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(self, auth: &AuthArgs, delimited: bool) -> MergedConfig {
        let mut stream = self.stream;
        if delimited {
            stream.framing = tweetstream_client::Framing::Length;
        }

        MergedConfig {
            stream,
            credentials: auth.credentials().or(self.auth),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub stream: StreamConfig,
    pub credentials: Option<Credentials>,
}

/// Parse `lon,lat,lon,lat,...` into corner points
pub fn parse_locations(value: &str) -> Result<Vec<(f64, f64)>> {
    let coords = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid coordinate: {:?}", part))
        })
        .collect::<Result<Vec<f64>>>()?;

    if coords.len() % 4 != 0 {
        bail!(
            "Locations must be bounding boxes of 4 coordinates each, got {}",
            coords.len()
        );
    }

    Ok(coords.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}
