//! Banking Event Receiver Library
//!
//! Re-exports modules for integration testing and external use.

pub mod config;
pub mod db;
pub mod domain;
pub mod intake;
pub mod ledger;
pub mod queue;
pub mod worker;

mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{Account, Amount, Balance, EventRecord, FailureKind, InstructionKind, TransactionEntry};
pub use worker::{DeliveryWorker, ProcessOutcome, WorkerConfig};
