//! Ledger Store ports
//!
//! The updater drives one `LedgerUnitOfWork` per event. Writes staged on a
//! unit of work become visible only on `commit`; dropping it rolls back.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, TransactionEntry};

/// Errors raised by a ledger backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend temporarily unreachable
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),

    /// Stored row cannot be mapped onto the domain model
    #[error("Invalid ledger record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    /// Check if retrying the unit of work may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Unavailable(_))
    }
}

/// Source of atomic units of work
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError>;
}

/// One atomic batch of ledger reads and writes
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    /// Load an account, locking it for the rest of the unit of work
    async fn find_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Entry previously committed for a queue message, if any
    async fn transaction_for_message(
        &mut self,
        message_id: Uuid,
    ) -> Result<Option<TransactionEntry>, StoreError>;

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn insert_transaction(&mut self, entry: &TransactionEntry) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
