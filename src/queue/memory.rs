//! In-memory queue
//!
//! FIFO queue with visibility times and a dead-letter area. Keeps a record
//! of every disposition so callers can inspect what happened to a message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::FailureKind;

use super::{DeadLetterEntry, QueueError, QueueGateway, QueueMessage};

#[derive(Debug, Clone)]
struct ScheduledMessage {
    message: QueueMessage,
    visible_at: DateTime<Utc>,
}

/// A reschedule request as seen by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reschedule {
    pub message_id: Uuid,
    pub visible_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<ScheduledMessage>,
    completed: Vec<QueueMessage>,
    dead_letters: Vec<DeadLetterEntry>,
    reschedules: Vec<Reschedule>,
    failing_completes: u32,
    failing_peeks: u32,
    failing_reschedules: u32,
    failing_dead_letters: u32,
    peeks: u64,
}

/// Queue held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a message, visible immediately
    pub fn enqueue(&self, message: QueueMessage) {
        self.lock().pending.push(ScheduledMessage {
            message,
            visible_at: Utc::now(),
        });
    }

    /// Wrap `payload` in a fresh message and enqueue it
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Uuid {
        let message = QueueMessage::new(payload);
        let id = message.id;
        self.enqueue(message);
        id
    }

    /// Messages still held by the queue, visible or not
    pub fn pending(&self) -> Vec<QueueMessage> {
        self.lock()
            .pending
            .iter()
            .map(|s| s.message.clone())
            .collect()
    }

    pub fn completed(&self) -> Vec<QueueMessage> {
        self.lock().completed.clone()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.lock().dead_letters.clone()
    }

    pub fn reschedules(&self) -> Vec<Reschedule> {
        self.lock().reschedules.clone()
    }

    /// Number of `peek` calls served
    pub fn peek_count(&self) -> u64 {
        self.lock().peeks
    }

    /// Make every rescheduled message visible now
    pub fn release_scheduled(&self) {
        let now = Utc::now();
        for scheduled in self.lock().pending.iter_mut() {
            scheduled.visible_at = scheduled.visible_at.min(now);
        }
    }

    /// Make the next `count` acknowledgements fail with a transient error
    pub fn fail_next_completes(&self, count: u32) {
        self.lock().failing_completes = count;
    }

    /// Make the next `count` peeks fail with a transient error
    pub fn fail_next_peeks(&self, count: u32) {
        self.lock().failing_peeks = count;
    }

    /// Make the next `count` reschedules fail with a transient error
    pub fn fail_next_reschedules(&self, count: u32) {
        self.lock().failing_reschedules = count;
    }

    /// Make the next `count` dead-letter moves fail with a transient error
    pub fn fail_next_dead_letters(&self, count: u32) {
        self.lock().failing_dead_letters = count;
    }
}

#[async_trait]
impl QueueGateway for InMemoryQueue {
    async fn peek(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut state = self.lock();
        state.peeks += 1;

        if state.failing_peeks > 0 {
            state.failing_peeks -= 1;
            return Err(QueueError::Unavailable("simulated peek failure".to_string()));
        }

        let now = Utc::now();
        Ok(state
            .pending
            .iter()
            .filter(|s| s.visible_at <= now)
            .min_by_key(|s| s.visible_at)
            .map(|s| s.message.clone()))
    }

    async fn complete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = self.lock();

        if state.failing_completes > 0 {
            state.failing_completes -= 1;
            return Err(QueueError::Unavailable(
                "simulated transport failure on complete".to_string(),
            ));
        }

        let index = state
            .pending
            .iter()
            .position(|s| s.message.id == message.id)
            .ok_or(QueueError::MessageNotFound(message.id))?;
        let scheduled = state.pending.remove(index);
        state.completed.push(scheduled.message);
        Ok(())
    }

    async fn reschedule(
        &self,
        message: &QueueMessage,
        visible_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut state = self.lock();

        if state.failing_reschedules > 0 {
            state.failing_reschedules -= 1;
            return Err(QueueError::Unavailable(
                "simulated transport failure on reschedule".to_string(),
            ));
        }

        let scheduled = state
            .pending
            .iter_mut()
            .find(|s| s.message.id == message.id)
            .ok_or(QueueError::MessageNotFound(message.id))?;
        scheduled.visible_at = visible_at;
        scheduled.message.delivery_count = scheduled.message.delivery_count.saturating_add(1);

        state.reschedules.push(Reschedule {
            message_id: message.id,
            visible_at,
        });
        Ok(())
    }

    async fn move_to_dead_letter(
        &self,
        message: &QueueMessage,
        reason: &str,
        failure_kind: FailureKind,
    ) -> Result<(), QueueError> {
        let mut state = self.lock();

        if state.failing_dead_letters > 0 {
            state.failing_dead_letters -= 1;
            return Err(QueueError::Unavailable(
                "simulated transport failure on dead-letter".to_string(),
            ));
        }

        let index = state
            .pending
            .iter()
            .position(|s| s.message.id == message.id)
            .ok_or(QueueError::MessageNotFound(message.id))?;
        let scheduled = state.pending.remove(index);

        state.dead_letters.push(DeadLetterEntry {
            message: scheduled.message,
            reason: reason.to_string(),
            failure_kind,
            dead_lettered_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_peek_does_not_remove() {
        let queue = InMemoryQueue::new();
        let id = queue.send(b"payload".to_vec());

        let first = queue.peek().await.unwrap().unwrap();
        let second = queue.peek().await.unwrap().unwrap();

        assert_eq!(first.id, id);
        assert_eq!(second.id, id);
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.peek_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_queue_peeks_none() {
        let queue = InMemoryQueue::new();
        assert!(queue.peek().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_removes_message() {
        let queue = InMemoryQueue::new();
        queue.send(b"payload".to_vec());

        let message = queue.peek().await.unwrap().unwrap();
        queue.complete(&message).await.unwrap();

        assert!(queue.peek().await.unwrap().is_none());
        assert_eq!(queue.completed(), vec![message.clone()]);
        assert!(matches!(
            queue.complete(&message).await,
            Err(QueueError::MessageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reschedule_hides_and_counts_delivery() {
        let queue = InMemoryQueue::new();
        queue.send(b"payload".to_vec());

        let message = queue.peek().await.unwrap().unwrap();
        let later = Utc::now() + Duration::seconds(5);
        queue.reschedule(&message, later).await.unwrap();

        assert!(queue.peek().await.unwrap().is_none());
        assert_eq!(queue.reschedules()[0].visible_at, later);

        queue.release_scheduled();
        let redelivered = queue.peek().await.unwrap().unwrap();
        assert_eq!(redelivered.id, message.id);
        assert_eq!(redelivered.delivery_count, 2);
    }

    #[tokio::test]
    async fn test_dead_letter_is_never_redelivered() {
        let queue = InMemoryQueue::new();
        queue.send(b"payload".to_vec());

        let message = queue.peek().await.unwrap().unwrap();
        queue
            .move_to_dead_letter(&message, "Invalid amount", FailureKind::Invalid)
            .await
            .unwrap();
        queue.release_scheduled();

        assert!(queue.peek().await.unwrap().is_none());
        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].message.id, message.id);
        assert_eq!(dead[0].reason, "Invalid amount");
        assert_eq!(dead[0].failure_kind, FailureKind::Invalid);
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient() {
        let queue = InMemoryQueue::new();
        queue.send(b"payload".to_vec());
        queue.fail_next_peeks(1);
        queue.fail_next_completes(1);

        assert!(queue.peek().await.unwrap_err().is_transient());
        let message = queue.peek().await.unwrap().unwrap();
        assert!(queue.complete(&message).await.unwrap_err().is_transient());
        queue.complete(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_dispositions_leave_message_untouched() {
        let queue = InMemoryQueue::new();
        queue.send(b"payload".to_vec());
        queue.fail_next_reschedules(1);
        queue.fail_next_dead_letters(1);

        let message = queue.peek().await.unwrap().unwrap();
        let later = Utc::now() + Duration::seconds(5);

        assert!(queue.reschedule(&message, later).await.unwrap_err().is_transient());
        assert!(queue
            .move_to_dead_letter(&message, "bad", FailureKind::Malformed)
            .await
            .unwrap_err()
            .is_transient());

        let still_queued = queue.peek().await.unwrap().unwrap();
        assert_eq!(still_queued.delivery_count, 1);
        assert!(queue.reschedules().is_empty());
        assert!(queue.dead_letters().is_empty());
    }
}
