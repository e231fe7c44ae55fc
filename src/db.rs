//! Database module
//!
//! Connection pool setup and schema verification.
//! The schema itself lives in `migrations/`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::Config;

/// Tables the receiver reads and writes
pub const REQUIRED_TABLES: [&str; 4] = [
    "bank_accounts",
    "transactions",
    "queue_messages",
    "dead_letter_messages",
];

/// Connect to the database and check that the schema is in place
pub async fn connect(config: &Config) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    verify_connection(&pool).await?;

    if !check_schema(&pool).await? {
        return Err(AppError::SchemaIncomplete);
    }

    Ok(pool)
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    tracing::info!("Database schema verified");
    Ok(true)
}
