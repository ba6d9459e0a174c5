//! Stream client configuration
//!
//! Every field has a default matching the public streaming API, so an empty
//! TOML table deserializes into a working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`StreamClient`](crate::StreamClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// URL scheme used to reach the stream hosts
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Host serving the public `statuses/*` streams
    #[serde(default = "default_stream_host")]
    pub stream_host: String,
    /// Host serving the per-user stream
    #[serde(default = "default_user_stream_host")]
    pub user_stream_host: String,
    /// API version path segment
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Seconds without any bytes before the connection is considered stalled
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Message framing expected on the wire
    #[serde(default)]
    pub framing: Framing,
    /// Reconnect policy
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl StreamConfig {
    /// Idle (stall) timeout
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            stream_host: default_stream_host(),
            user_stream_host: default_user_stream_host(),
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            idle_timeout_secs: default_idle_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            framing: Framing::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_stream_host() -> String {
    "stream.twitter.com".to_string()
}

fn default_user_stream_host() -> String {
    "userstream.twitter.com".to_string()
}

fn default_api_version() -> String {
    "1.1".to_string()
}

fn default_user_agent() -> String {
    format!("tweetstream/{}", env!("CARGO_PKG_VERSION"))
}

fn default_idle_timeout_secs() -> u64 {
    90
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// How message boundaries are marked on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One message per line (`\r\n` or `\n` terminated)
    #[default]
    Newline,
    /// Each message preceded by a line holding its byte length (`delimited=length`)
    Length,
}

/// Exponential reconnect backoff parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first reconnect, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Growth factor between consecutive delays (values below 1.0 are treated as 1.0)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Upper bound for a single delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Consecutive failed reconnects tolerated before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl BackoffConfig {
    /// Base delay
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Delay cap
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// A policy with no delay between attempts, for tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
            max_retries,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    240_000
}

fn default_max_retries() -> u32 {
    320
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(90));
        assert_eq!(config.stream_host, "stream.twitter.com");
        assert_eq!(config.framing, Framing::Newline);
        assert!(config.user_agent.starts_with("tweetstream/"));
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: StreamConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StreamConfig::default());
    }

    #[test]
    fn test_partial_backoff_override() {
        let config: StreamConfig =
            serde_json::from_str(r#"{"framing":"length","backoff":{"max_retries":3}}"#).unwrap();
        assert_eq!(config.framing, Framing::Length);
        assert_eq!(config.backoff.max_retries, 3);
        assert_eq!(config.backoff.base_delay(), Duration::from_millis(250));
    }
}
