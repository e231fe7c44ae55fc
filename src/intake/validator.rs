//! Event Validator
//!
//! Structural and business-rule checks that run before an event touches the
//! ledger. The first violated rule is reported.

use rust_decimal::Decimal;

use crate::domain::{Amount, AmountError, EventRecord, FailureKind, ValidatedEvent};

/// Event is semantically invalid; permanent regardless of redelivery.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid amount: must be greater than zero (got {0})")]
    NonPositiveAmount(Decimal),

    #[error("Invalid message type: {0}")]
    UnrecognizedKind(String),

    #[error("Invalid BankAccountId: empty")]
    EmptyAccountId,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
}

impl ValidationError {
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::Invalid
    }
}

/// Validate a decoded record, producing an event the ledger can apply
pub fn validate(record: &EventRecord) -> Result<ValidatedEvent, ValidationError> {
    if record.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(record.amount));
    }

    let kind = match &record.message_type {
        Some(code) => code
            .recognize()
            .ok_or_else(|| ValidationError::UnrecognizedKind(code.to_string()))?,
        None => return Err(ValidationError::UnrecognizedKind("<missing>".to_string())),
    };

    if record.bank_account_id.is_nil() {
        return Err(ValidationError::EmptyAccountId);
    }

    let amount = Amount::new(record.amount)?;

    Ok(ValidatedEvent {
        event_id: record.id,
        account_id: record.bank_account_id,
        amount,
        kind,
        attempt_count: record.attempt_count,
    })
}
