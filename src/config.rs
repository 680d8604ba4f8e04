//! Command-line and environment configuration of the `order-board` binary.
//!
//! Every flag has an `ORDER_BOARD_*` environment fallback so the board can be
//! configured entirely from its service unit:
//!
//! ```bash
//! ORDER_BOARD_URL=https://my-db.firebaseio.com ORDER_BOARD_INTERVAL_SECS=5 order-board
//! order-board --url https://my-db.firebaseio.com --mode stream
//! ```

use clap::{Parser, ValueEnum};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors raised while validating the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Database URL must start with http:// or https://, got `{0}`")]
    InvalidUrl(String),

    #[error("Collection name must not be empty")]
    EmptyCollection,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// How snapshots are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    /// Fetch the whole collection on a fixed interval.
    Poll,
    /// Follow the server-sent event stream, falling back to polling if it cannot be opened.
    Stream,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "order-board")]
#[command(about = "Live order board for the kitchen counter")]
pub struct Cli {
    /// Realtime database root URL
    #[arg(short, long, env = "ORDER_BOARD_URL")]
    pub url: String,

    /// Collection holding the orders
    #[arg(short, long, env = "ORDER_BOARD_COLLECTION", default_value = "orders")]
    pub collection: String,

    /// Database auth token, appended as `?auth=`
    #[arg(long, env = "ORDER_BOARD_AUTH", hide_env_values = true)]
    pub auth: Option<String>,

    #[arg(short, long, env = "ORDER_BOARD_MODE", value_enum, default_value = "poll")]
    pub mode: SourceMode,

    /// Seconds between polls
    #[arg(short, long, env = "ORDER_BOARD_INTERVAL_SECS", default_value = "3")]
    pub interval_secs: f64,

    /// Seconds before a fetch is abandoned
    #[arg(long, env = "ORDER_BOARD_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: f64,

    /// Seconds after start-up during which new orders do not ring
    #[arg(long, env = "ORDER_BOARD_GRACE_SECS", default_value = "0")]
    pub grace_secs: f64,

    /// Seconds a freshly arrived card stays highlighted
    #[arg(long, env = "ORDER_BOARD_HIGHLIGHT_SECS", default_value = "5")]
    pub highlight_secs: f64,

    /// Ring the terminal bell on new orders
    #[arg(long, env = "ORDER_BOARD_BELL")]
    pub bell: bool,
}

/// Validated board settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub url: String,
    pub collection: String,
    pub auth: Option<String>,
    pub mode: SourceMode,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub grace_period: Duration,
    pub highlight: Duration,
    pub bell: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: "orders".to_string(),
            auth: None,
            mode: SourceMode::Poll,
            poll_interval: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(10),
            grace_period: Duration::ZERO,
            highlight: Duration::from_secs(5),
            bell: false,
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl TryFrom<Cli> for BoardConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let url = cli.url.trim().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        let collection = cli.collection.trim().trim_matches('/').to_string();
        if collection.is_empty() {
            return Err(ConfigError::EmptyCollection);
        }

        let poll_interval = seconds(cli.interval_secs);
        if poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("Poll interval"));
        }
        if poll_interval < Duration::from_secs(1) {
            warn!(?poll_interval, "Sub-second polling against a remote database is discouraged");
        }
        let fetch_timeout = seconds(cli.timeout_secs);
        if fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("Fetch timeout"));
        }

        Ok(Self {
            url,
            collection,
            auth: cli.auth.filter(|token| !token.is_empty()),
            mode: cli.mode,
            poll_interval,
            fetch_timeout,
            grace_period: seconds(cli.grace_secs),
            highlight: seconds(cli.highlight_secs),
            bell: cli.bell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<BoardConfig, ConfigError> {
        let mut argv = vec!["order-board"];
        argv.extend_from_slice(args);
        BoardConfig::try_from(Cli::try_parse_from(argv).expect("arguments parse"))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--url", "https://db.example.com/"]).unwrap();
        assert_eq!(
            config,
            BoardConfig {
                url: "https://db.example.com/".to_string(),
                ..BoardConfig::default()
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--url", "http://localhost:9000",
            "--collection", "/commandes/",
            "--mode", "stream",
            "--interval-secs", "0.5",
            "--grace-secs", "10",
            "--bell",
        ])
        .unwrap();
        assert_eq!(config.collection, "commandes");
        assert_eq!(config.mode, SourceMode::Stream);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.grace_period, Duration::from_secs(10));
        assert!(config.bell);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            parse(&["--url", "db.example.com"]),
            Err(ConfigError::InvalidUrl("db.example.com".to_string()))
        );
        assert_eq!(
            parse(&["--url", "https://db", "--collection", "/"]),
            Err(ConfigError::EmptyCollection)
        );
        assert_eq!(
            parse(&["--url", "https://db", "--interval-secs", "0"]),
            Err(ConfigError::ZeroDuration("Poll interval"))
        );
        assert_eq!(
            parse(&["--url", "https://db", "--interval-secs=-2"]),
            Err(ConfigError::ZeroDuration("Poll interval"))
        );
    }
}
