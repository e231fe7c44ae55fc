//! Banking Event Receiver
//!
//! Consumes credit/debit events from the PostgreSQL-backed queue and applies
//! them to the account ledger, one message at a time.

use banking_event_receiver::ledger::PgLedgerStore;
use banking_event_receiver::queue::PgQueueGateway;
use banking_event_receiver::{db, Config, DeliveryWorker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging; production emits JSON lines
fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "banking_event_receiver=debug".into()),
    );

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(config.is_production());

    tracing::info!(environment = %config.environment, "Starting banking event receiver");
    tracing::info!("Connecting to database...");

    let pool = db::connect(&config).await?;

    tracing::info!("Database connected successfully");

    let worker = DeliveryWorker::with_config(
        Box::new(PgQueueGateway::new(pool.clone())),
        Box::new(PgLedgerStore::new(pool.clone())),
        config.worker_config(),
    );

    // Stops between messages, never in the middle of a ledger update
    worker.run_until(shutdown_signal()).await;

    tracing::info!("Receiver shutting down...");
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
