//! Delivery Worker
//!
//! Single-consumer loop: peek, decode, validate, apply, then settle the
//! message as completed, rescheduled or dead-lettered.

use std::future::Future;

use chrono::Utc;

use crate::intake::{decode, validate};
use crate::ledger::{AppliedResult, LedgerStoreBox, LedgerUpdater};
use crate::queue::{QueueError, QueueGatewayBox, QueueMessage};

use super::{ProcessOutcome, ProcessingFailure, WorkerConfig};

/// Pulls events off the queue and applies them to the ledger
pub struct DeliveryWorker {
    queue: QueueGatewayBox,
    updater: LedgerUpdater,
    config: WorkerConfig,
}

impl DeliveryWorker {
    /// Create a worker with default polling and retry settings
    pub fn new(queue: QueueGatewayBox, ledger: LedgerStoreBox) -> Self {
        Self::with_config(queue, ledger, WorkerConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(queue: QueueGatewayBox, ledger: LedgerStoreBox, config: WorkerConfig) -> Self {
        Self {
            queue,
            updater: LedgerUpdater::new(ledger),
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run until the process is terminated
    pub async fn run(&self) {
        self.run_until(std::future::pending()).await;
    }

    /// Run until `shutdown` resolves.
    ///
    /// Shutdown is only observed between messages or while idle; a message
    /// being applied is always settled first.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Delivery worker started");
        tokio::pin!(shutdown);

        loop {
            let pause = match self.process_next().await {
                Ok(ProcessOutcome::Idle) => Some(self.config.poll_interval),
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to settle message");
                    Some(self.config.poll_interval)
                }
            };

            match pause {
                Some(wait) => tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(wait) => {}
                },
                None => tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = tokio::task::yield_now() => {}
                },
            }
        }

        tracing::info!("Delivery worker stopped");
    }

    /// Process at most one message.
    ///
    /// Never sleeps: an empty queue is reported as `Idle` and the caller
    /// decides how long to wait. Errors are returned only when the queue
    /// refuses the final disposition, in which case the message stays queued.
    pub async fn process_next(&self) -> Result<ProcessOutcome, QueueError> {
        let message = match self.queue.peek().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::info!(
                    "No messages found, waiting for {} seconds.",
                    self.config.poll_interval.as_secs()
                );
                return Ok(ProcessOutcome::Idle);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to peek queue, waiting before next poll");
                return Ok(ProcessOutcome::Idle);
            }
        };

        tracing::info!(
            message_id = %message.id,
            attempt = message.delivery_count,
            "Message received"
        );

        let applied = match self.handle(&message).await {
            Ok(applied) => applied,
            Err(failure) if failure.kind.is_retryable() => {
                tracing::warn!(
                    message_id = %message.id,
                    reason = %failure.reason,
                    "Transient failure processing message"
                );
                return self.retry_or_dead_letter(&message, failure).await;
            }
            Err(failure) => {
                tracing::error!(
                    message_id = %message.id,
                    failure_kind = %failure.kind,
                    reason = %failure.reason,
                    "Non-transient failure processing message"
                );
                return self.dead_letter(&message, failure).await;
            }
        };

        match self.queue.complete(&message).await {
            Ok(()) => {
                tracing::info!(
                    message_id = %message.id,
                    transaction_id = %applied.transaction_id,
                    "Message processed successfully"
                );
                Ok(ProcessOutcome::Completed {
                    message_id: message.id,
                    transaction_id: applied.transaction_id,
                    duplicate: applied.duplicate,
                })
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    message_id = %message.id,
                    error = %e,
                    "Transient failure acknowledging message"
                );
                self.retry_or_dead_letter(&message, e.into()).await
            }
            Err(e) => Err(e),
        }
    }

    async fn handle(&self, message: &QueueMessage) -> Result<AppliedResult, ProcessingFailure> {
        let record = decode(&message.payload)?.with_attempt_count(message.delivery_count);
        let event = validate(&record)?;
        let applied = self.updater.apply(&event, message.id).await?;
        Ok(applied)
    }

    async fn retry_or_dead_letter(
        &self,
        message: &QueueMessage,
        failure: ProcessingFailure,
    ) -> Result<ProcessOutcome, QueueError> {
        let attempt = message.delivery_count;

        if self.config.retries_exhausted(attempt) {
            tracing::warn!(
                message_id = %message.id,
                attempt,
                "Retry budget exhausted"
            );
            return self.dead_letter(message, failure).await;
        }

        let delay = self.config.backoff_delay(attempt);
        let visible_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

        self.queue.reschedule(message, visible_at).await?;

        tracing::warn!(
            message_id = %message.id,
            attempt,
            delay_secs = delay.as_secs(),
            "Message rescheduled"
        );

        Ok(ProcessOutcome::Rescheduled {
            message_id: message.id,
            attempt,
            delay,
            visible_at,
        })
    }

    async fn dead_letter(
        &self,
        message: &QueueMessage,
        failure: ProcessingFailure,
    ) -> Result<ProcessOutcome, QueueError> {
        tracing::error!(
            message_id = %message.id,
            failure_kind = %failure.kind,
            reason = %failure.reason,
            "Moving message to dead-letter"
        );

        self.queue
            .move_to_dead_letter(message, &failure.reason, failure.kind)
            .await?;

        Ok(ProcessOutcome::DeadLettered {
            message_id: message.id,
            failure_kind: failure.kind,
            reason: failure.reason,
        })
    }
}
