//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `FLIGHTWATCH_*` environment variables, or a
//! configuration file, in OrthoConfig's usual precedence. Optional knobs fall
//! back to defaults in their accessors.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::PollDriverConfig;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_TICKETING_BASE_URL: &str = "https://ticket.vanillasky.ge";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 8;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Problems found while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required value was not supplied.
    #[error("missing required setting {key}")]
    Missing {
        /// Environment variable that would supply it.
        key: &'static str,
    },
    /// A URL setting could not be parsed.
    #[error("setting {key} is not a valid URL: {message}")]
    InvalidUrl {
        /// Environment variable holding the value.
        key: &'static str,
        /// Parser message.
        message: String,
    },
}

/// Configuration values for the poller, the bot, and the database.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FLIGHTWATCH")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Telegram bot token.
    pub telegram_token: Option<String>,
    /// Bot API base URL override.
    pub telegram_api_base: Option<String>,
    /// Ticketing site base URL override.
    pub ticketing_base_url: Option<String>,
    /// Seconds between poll cycle starts.
    pub poll_interval_secs: Option<u64>,
    /// Seconds allowed for each ticketing request.
    pub fetch_timeout_secs: Option<u64>,
    /// Ticketing requests allowed in flight at once.
    pub max_concurrent_fetches: Option<usize>,
    /// Chat deliveries allowed in flight at once.
    pub max_concurrent_deliveries: Option<usize>,
    /// Size of the database connection pool.
    pub database_max_connections: Option<u32>,
    /// Apply embedded migrations on startup.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// PostgreSQL connection string.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        required(self.database_url.as_deref(), "FLIGHTWATCH_DATABASE_URL")
    }

    /// Telegram bot token.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset or blank.
    pub fn telegram_token(&self) -> Result<&str, SettingsError> {
        required(self.telegram_token.as_deref(), "FLIGHTWATCH_TELEGRAM_TOKEN")
    }

    /// Bot API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for an unparsable override.
    pub fn telegram_api_base(&self) -> Result<Url, SettingsError> {
        parse_url(
            self.telegram_api_base.as_deref(),
            DEFAULT_TELEGRAM_API_BASE,
            "FLIGHTWATCH_TELEGRAM_API_BASE",
        )
    }

    /// Ticketing site base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] for an unparsable override.
    pub fn ticketing_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            self.ticketing_base_url.as_deref(),
            DEFAULT_TICKETING_BASE_URL,
            "FLIGHTWATCH_TICKETING_BASE_URL",
        )
    }

    /// Per-request ticketing timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Poll driver cadence and fan-out limits.
    pub fn poll_driver_config(&self) -> PollDriverConfig {
        PollDriverConfig {
            poll_interval: Duration::from_secs(
                self.poll_interval_secs
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            fetch_timeout: self.fetch_timeout(),
            max_concurrent_fetches: self
                .max_concurrent_fetches
                .unwrap_or(DEFAULT_MAX_CONCURRENT_FETCHES),
            max_concurrent_deliveries: self
                .max_concurrent_deliveries
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DELIVERIES),
        }
    }

    /// Connection pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no database URL is set.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        Ok(PoolConfig::new(self.database_url()?).with_max_size(
            self.database_max_connections
                .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
        ))
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AppSettings")
            .field("database_url", &redacted(&self.database_url))
            .field("telegram_token", &redacted(&self.telegram_token))
            .field("telegram_api_base", &self.telegram_api_base)
            .field("ticketing_base_url", &self.ticketing_base_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("max_concurrent_deliveries", &self.max_concurrent_deliveries)
            .field("database_max_connections", &self.database_max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, SettingsError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SettingsError::Missing { key })
}

fn parse_url(
    value: Option<&str>,
    default: &str,
    key: &'static str,
) -> Result<Url, SettingsError> {
    Url::parse(value.unwrap_or(default)).map_err(|error| SettingsError::InvalidUrl {
        key,
        message: error.to_string(),
    })
}
