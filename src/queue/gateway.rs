//! Queue Gateway port
//!
//! The primitives the delivery worker needs from a message transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::FailureKind;

/// A message as handed out by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: Uuid,
    pub payload: Vec<u8>,
    /// Deliveries so far, including the current one; starts at 1
    pub delivery_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    /// Create a fresh message on its first delivery
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
            delivery_count: 1,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_delivery_count(mut self, delivery_count: u32) -> Self {
        self.delivery_count = delivery_count;
        self
    }
}

/// Message parked in the dead-letter area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub message: QueueMessage,
    pub reason: String,
    pub failure_kind: FailureKind,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Database error
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport temporarily unreachable
    #[error("Queue transport unavailable: {0}")]
    Unavailable(String),

    /// Message is no longer held by the queue
    #[error("Message not found in queue: {0}")]
    MessageNotFound(Uuid),

    /// Stored row does not describe a valid message
    #[error("Invalid queue record: {0}")]
    InvalidRecord(String),
}

impl QueueError {
    /// Check if the operation may succeed when retried later
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Database(_) | QueueError::Unavailable(_))
    }
}

#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Next visible message, without removing it
    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError>;

    /// Acknowledge and remove a processed message
    async fn complete(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Hide the message until `visible_at`; its delivery count goes up by one
    async fn reschedule(
        &self,
        message: &QueueMessage,
        visible_at: DateTime<Utc>,
    ) -> Result<(), QueueError>;

    /// Remove the message from normal delivery for manual inspection
    async fn move_to_dead_letter(
        &self,
        message: &QueueMessage,
        reason: &str,
        failure_kind: FailureKind,
    ) -> Result<(), QueueError>;
}

pub type QueueGatewayBox = Box<dyn QueueGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_is_first_delivery() {
        let message = QueueMessage::new(b"{}".to_vec());
        assert_eq!(message.delivery_count, 1);
        assert_eq!(message.payload, b"{}");
    }

    #[test]
    fn test_queue_error_classification() {
        assert!(QueueError::Unavailable("broker restarting".to_string()).is_transient());
        assert!(QueueError::Database(sqlx::Error::PoolClosed).is_transient());
        assert!(!QueueError::MessageNotFound(Uuid::nil()).is_transient());
        assert!(!QueueError::InvalidRecord("unknown failure kind".to_string()).is_transient());
    }
}
