//! Session configuration.

use framefeed_core::Endpoint;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for a [`Session`](crate::Session).
///
/// Every field has a default, so an empty TOML document is a valid config.
/// Millisecond values of `0` disable the readiness timeout and the fault
/// grace timer; the poll and keep-alive intervals must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Where frames are streamed from.
    pub endpoint: Endpoint,
    /// How often the host is probed for the render target.
    pub poll_interval_ms: u64,
    /// Delay between discovery and the automatic connect.
    pub settle_delay_ms: u64,
    /// Give up probing after this long.
    pub readiness_timeout_ms: u64,
    /// Interval between keep-alive tokens while open.
    pub keepalive_interval_ms: u64,
    /// How long a fault may go without a close before cleanup is forced.
    pub fault_grace_ms: u64,
    /// Connect once automatically after discovery.
    pub auto_connect: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::ws("127.0.0.1:8010", "/ws/annotated"),
            poll_interval_ms: 100,
            settle_delay_ms: 500,
            readiness_timeout_ms: 30_000,
            keepalive_interval_ms: 5_000,
            fault_grace_ms: 2_000,
            auto_connect: true,
        }
    }
}

impl FeedConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_ms"));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("keepalive_interval_ms"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// `None` means probe forever.
    pub fn readiness_timeout(&self) -> Option<Duration> {
        non_zero(self.readiness_timeout_ms)
    }

    /// `None` means a fault never forces cleanup on its own.
    pub fn fault_grace(&self) -> Option<Duration> {
        non_zero(self.fault_grace_ms)
    }
}

fn non_zero(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Error loading a [`FeedConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = FeedConfig::from_toml("").unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(
            config.endpoint.to_string(),
            "ws://127.0.0.1:8010/ws/annotated"
        );
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.keepalive_interval(), Duration::from_secs(5));
    }

    #[test]
    fn overrides_and_disabled_timers() {
        let config = FeedConfig::from_toml(
            r#"
            endpoint = "wss://cams.example.org/ws/annotated"
            readiness_timeout_ms = 0
            fault_grace_ms = 0
            auto_connect = false
            "#,
        )
        .unwrap();
        assert!(config.endpoint.is_secure());
        assert_eq!(config.readiness_timeout(), None);
        assert_eq!(config.fault_grace(), None);
        assert!(!config.auto_connect);
    }

    #[test]
    fn rejects_zero_intervals() {
        let err = FeedConfig::from_toml("keepalive_interval_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroInterval("keepalive_interval_ms")
        ));
        let err = FeedConfig::from_toml("poll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval("poll_interval_ms")));
    }

    #[test]
    fn rejects_bad_endpoint_and_unknown_keys() {
        assert!(matches!(
            FeedConfig::from_toml(r#"endpoint = "tcp://x""#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            FeedConfig::from_toml("reconnect = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = FeedConfig::load(Path::new("/nonexistent/framefeed.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/framefeed.toml"));
    }
}
