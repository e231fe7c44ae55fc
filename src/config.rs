//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::worker::{WorkerConfig, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Seconds to wait between polls of an empty queue
    pub poll_interval_secs: u64,

    /// Delivery count at which transient failures are dead-lettered
    pub max_attempts: u32,

    /// Base of the exponential retry backoff, in seconds
    pub backoff_base_secs: u32,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10)?;
        let poll_interval_secs = parse_env("WORKER_POLL_INTERVAL_SECS", 10)?;
        let max_attempts = parse_env("WORKER_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let backoff_base_secs = parse_env("WORKER_BACKOFF_BASE_SECS", DEFAULT_BACKOFF_BASE)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            poll_interval_secs,
            max_attempts,
            backoff_base_secs,
            environment,
        })
    }

    /// Worker settings derived from this configuration
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_max_attempts(self.max_attempts)
            .with_backoff_base(self.backoff_base_secs)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database_url: "postgres://localhost/receiver".to_string(),
            database_max_connections: 5,
            poll_interval_secs: 2,
            max_attempts: 4,
            backoff_base_secs: 3,
            environment: "production".to_string(),
        }
    }

    #[test]
    fn test_worker_config_from_settings() {
        let worker = sample().worker_config();
        assert_eq!(worker.poll_interval, Duration::from_secs(2));
        assert_eq!(worker.max_attempts, 4);
        assert_eq!(worker.backoff_delay(2), Duration::from_secs(9));
    }

    #[test]
    fn test_is_production() {
        assert!(sample().is_production());
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u32 = parse_env("BANKING_EVENT_RECEIVER_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_config_error_display() {
        assert!(ConfigError::MissingEnv("DATABASE_URL")
            .to_string()
            .contains("DATABASE_URL"));
        assert!(ConfigError::InvalidValue("WORKER_MAX_ATTEMPTS")
            .to_string()
            .contains("Invalid value"));
    }
}
