//! Delivery worker module
//!
//! Drives messages from the queue through decoding, validation and the
//! ledger, and decides between completion, retry and dead-lettering.

mod config;
mod controller;
mod outcome;


pub use config::{
    WorkerConfig, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL,
};
pub use controller::DeliveryWorker;
pub use outcome::{ProcessOutcome, ProcessingFailure};
