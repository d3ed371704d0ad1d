//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::{env, str::FromStr, time::Duration};

use super::timeouts::DEFAULT_TRANSACTION_TIMEOUT;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,

    /// Upper bound on one bracket transaction, in seconds
    pub transaction_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 1)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    /// - `BRACKET_TX_TIMEOUT_SECS`: Bracket transaction timeout (default: 10)
    ///
    /// # Errors
    ///
    /// * `ConfigError::MissingRequired` - `DATABASE_URL` is not set
    /// * `ConfigError::Invalid` - a numeric variable does not parse or the
    ///   pool bounds are inverted
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "e.g. postgres://postgres@localhost/brackets".to_string(),
        })?;
        Self::from_env_with_url(database_url)
    }

    /// Pool and timeout settings from the environment, URL supplied by the caller
    ///
    /// Reads the same optional variables as [`DatabaseConfig::from_env`].
    pub fn from_env_with_url(database_url: impl Into<String>) -> Result<Self, ConfigError> {
        let database_url = database_url.into();
        let defaults = Self::development();
        let config = Self {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connection_timeout_secs: parse_env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            )?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs)?,
            transaction_timeout_secs: parse_env_or(
                "BRACKET_TX_TIMEOUT_SECS",
                defaults.transaction_timeout_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/brackets` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/brackets".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            transaction_timeout_secs: DEFAULT_TRANSACTION_TIMEOUT.as_secs(),
        }
    }

    /// Replace the connection URL
    pub fn with_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    /// Transaction timeout as a `Duration`
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }

    /// Check the values for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.max_connections
                ),
            });
        }

        if self.transaction_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "BRACKET_TX_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an optional environment variable, falling back to `default` when unset
///
/// A variable that is set but does not parse is an error rather than a
/// silent fallback.
pub fn parse_env_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
