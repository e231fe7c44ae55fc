//! Error handling module
//!
//! Errors raised while bringing the receiver up. Per-message failures are
//! classified by the worker and never surface here.

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database schema is not complete. Please run migrations.")]
    SchemaIncomplete,
}
