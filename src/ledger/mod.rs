//! Ledger module
//!
//! Account balances and the transaction audit trail: storage ports, the
//! in-memory and PostgreSQL backends, and the updater that applies events.

mod memory;
mod postgres;
mod store;
mod updater;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::{LedgerStore, LedgerStoreBox, LedgerUnitOfWork, StoreError};
pub use updater::{AppliedResult, ApplyError, LedgerUpdater};
