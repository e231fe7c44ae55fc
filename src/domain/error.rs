//! Domain Error Types
//!
//! Pure domain errors and the failure taxonomy used to decide what happens
//! to a message after a failed processing attempt.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Classification of a processing failure.
///
/// Only `Transient` failures consume the retry budget. Everything else is a
/// content failure: redelivering the same message cannot change the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Payload could not be decoded into an event record
    Malformed,
    /// Event decoded but breaks a structural rule
    Invalid,
    /// Event is well formed but the ledger rejects it
    BusinessRule,
    /// Infrastructure or connectivity trouble
    Transient,
}

impl FailureKind {
    /// Whether redelivery may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Malformed => "malformed",
            FailureKind::Invalid => "invalid",
            FailureKind::BusinessRule => "business_rule",
            FailureKind::Transient => "transient",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "malformed" => Ok(FailureKind::Malformed),
            "invalid" => Ok(FailureKind::Invalid),
            "business_rule" => Ok(FailureKind::BusinessRule),
            "transient" => Ok(FailureKind::Transient),
            other => Err(format!("unknown failure kind: {}", other)),
        }
    }
}

/// Business rule violations raised while mutating an account.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Debit larger than the current balance
    #[error("Insufficient funds in account {account_id}: required {required}, available {available}")]
    InsufficientFunds {
        account_id: Uuid,
        required: Decimal,
        available: Decimal,
    },

    /// Credit would exceed the representable balance
    #[error("Balance overflow in account {0}")]
    BalanceOverflow(Uuid),
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(account_id: Uuid, required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            account_id,
            required,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(FailureKind::Transient.is_retryable());
        assert!(!FailureKind::Malformed.is_retryable());
        assert!(!FailureKind::Invalid.is_retryable());
        assert!(!FailureKind::BusinessRule.is_retryable());
    }

    #[test]
    fn test_failure_kind_string_forms() {
        for kind in [
            FailureKind::Malformed,
            FailureKind::Invalid,
            FailureKind::BusinessRule,
            FailureKind::Transient,
        ] {
            assert_eq!(kind.to_string().parse::<FailureKind>(), Ok(kind));
        }
        assert!("retry".parse::<FailureKind>().is_err());
    }

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(Uuid::nil(), Decimal::new(100, 0), Decimal::new(50, 0));

        let message = err.to_string();
        assert!(message.contains("100"));
        assert!(message.contains("50"));
    }
}
