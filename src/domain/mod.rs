//! Domain module
//!
//! Core domain types and business rules.

pub mod account;
pub mod amount;
pub mod error;
pub mod event;

pub use account::{Account, TransactionEntry};
pub use amount::{Amount, AmountError, Balance};
pub use error::{DomainError, FailureKind};
pub use event::{EventRecord, InstructionKind, KindCode, ValidatedEvent};
