//! Processing outcomes
//!
//! Every pass of the worker ends in exactly one `ProcessOutcome`. Failures
//! along the way are flattened into a `ProcessingFailure` carrying its
//! `FailureKind`, so the disposition is a plain match on the kind.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::FailureKind;
use crate::intake::{DecodeError, ValidationError};
use crate::ledger::ApplyError;
use crate::queue::QueueError;

/// What one worker pass did
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// No visible message (or the transport could not be read)
    Idle,
    /// Applied and acknowledged
    Completed {
        message_id: Uuid,
        transaction_id: Uuid,
        duplicate: bool,
    },
    /// Transient failure, handed back for later redelivery
    Rescheduled {
        message_id: Uuid,
        attempt: u32,
        delay: Duration,
        visible_at: DateTime<Utc>,
    },
    /// Given up on; parked in the dead-letter area
    DeadLettered {
        message_id: Uuid,
        failure_kind: FailureKind,
        reason: String,
    },
}

impl ProcessOutcome {
    pub fn is_idle(&self) -> bool {
        matches!(self, ProcessOutcome::Idle)
    }
}

/// A classified failure from any processing stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl ProcessingFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.reason)
    }
}

impl From<DecodeError> for ProcessingFailure {
    fn from(err: DecodeError) -> Self {
        Self::new(err.failure_kind(), err.to_string())
    }
}

impl From<ValidationError> for ProcessingFailure {
    fn from(err: ValidationError) -> Self {
        Self::new(err.failure_kind(), err.to_string())
    }
}

impl From<ApplyError> for ProcessingFailure {
    fn from(err: ApplyError) -> Self {
        Self::new(err.failure_kind(), err.to_string())
    }
}

impl From<QueueError> for ProcessingFailure {
    fn from(err: QueueError) -> Self {
        let kind = if err.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::BusinessRule
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::decode;

    #[test]
    fn test_classification_from_stage_errors() {
        let decode_err = decode(b"not json").unwrap_err();
        assert_eq!(ProcessingFailure::from(decode_err).kind, FailureKind::Malformed);

        let invalid = ValidationError::EmptyAccountId;
        assert_eq!(ProcessingFailure::from(invalid).kind, FailureKind::Invalid);

        let missing = ApplyError::AccountNotFound(Uuid::nil());
        assert_eq!(ProcessingFailure::from(missing).kind, FailureKind::BusinessRule);

        let transport = QueueError::Unavailable("connection reset".to_string());
        let failure = ProcessingFailure::from(transport);
        assert_eq!(failure.kind, FailureKind::Transient);
        assert!(failure.to_string().starts_with("transient failure"));
    }
}
