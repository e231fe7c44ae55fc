//! PostgreSQL-table queue
//!
//! Messages live in `queue_messages` until completed; dead-lettered
//! messages move to `dead_letter_messages` in the same transaction they are
//! removed in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::FailureKind;

use super::{DeadLetterEntry, QueueError, QueueGateway, QueueMessage};

type MessageRow = (Uuid, Vec<u8>, i32, DateTime<Utc>);
type DeadLetterRow = (Uuid, Vec<u8>, i32, DateTime<Utc>, String, String, DateTime<Utc>);

fn message_from_row((id, payload, delivery_count, enqueued_at): MessageRow) -> QueueMessage {
    // a count below 1 would never reach the retry ceiling
    if delivery_count < 1 {
        tracing::warn!(
            message_id = %id,
            delivery_count,
            "Stored delivery count out of range, treating as first delivery"
        );
    }

    QueueMessage {
        id,
        payload,
        delivery_count: delivery_count.max(1).unsigned_abs(),
        enqueued_at,
    }
}

fn dead_letter_from_row(
    (id, payload, delivery_count, enqueued_at, reason, failure_kind, dead_lettered_at): DeadLetterRow,
) -> Result<DeadLetterEntry, QueueError> {
    let failure_kind: FailureKind = failure_kind.parse().map_err(|e| {
        QueueError::InvalidRecord(format!("dead letter {}: {}", id, e))
    })?;

    Ok(DeadLetterEntry {
        message: message_from_row((id, payload, delivery_count, enqueued_at)),
        reason,
        failure_kind,
        dead_lettered_at,
    })
}

/// Queue backed by PostgreSQL tables
#[derive(Debug, Clone)]
pub struct PgQueueGateway {
    pool: PgPool,
}

impl PgQueueGateway {
    /// Create a new PgQueueGateway
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Publish a payload; returns the new message id
    pub async fn enqueue(&self, payload: &[u8]) -> Result<Uuid, QueueError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO queue_messages (id, payload)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Most recent dead letters first
    pub async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetterEntry>, QueueError> {
        let rows: Vec<DeadLetterRow> = sqlx::query_as(
            r#"
            SELECT id, payload, delivery_count, enqueued_at, reason, failure_kind, dead_lettered_at
            FROM dead_letter_messages
            ORDER BY dead_lettered_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(dead_letter_from_row).collect()
    }
}

#[async_trait]
impl QueueGateway for PgQueueGateway {
    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError> {
        let row: Option<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, payload, delivery_count, enqueued_at
            FROM queue_messages
            WHERE visible_at <= NOW()
            ORDER BY visible_at, enqueued_at
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(message_from_row))
    }

    async fn complete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let rows = sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(message.id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(QueueError::MessageNotFound(message.id));
        }

        Ok(())
    }

    async fn reschedule(
        &self,
        message: &QueueMessage,
        visible_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let rows = sqlx::query(
            r#"
            UPDATE queue_messages
            SET visible_at = $2, delivery_count = delivery_count + 1
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(visible_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(QueueError::MessageNotFound(message.id));
        }

        Ok(())
    }

    async fn move_to_dead_letter(
        &self,
        message: &QueueMessage,
        reason: &str,
        failure_kind: FailureKind,
    ) -> Result<(), QueueError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            INSERT INTO dead_letter_messages (
                id, payload, delivery_count, enqueued_at, reason, failure_kind
            )
            SELECT id, payload, delivery_count, enqueued_at, $2, $3
            FROM queue_messages
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(reason)
        .bind(failure_kind.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(QueueError::MessageNotFound(message.id));
        }

        sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(message.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
