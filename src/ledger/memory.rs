//! In-memory ledger store
//!
//! Staged writes are applied under a single lock on commit, which gives the
//! same all-or-nothing visibility as a database transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Balance, TransactionEntry};

use super::{LedgerStore, LedgerUnitOfWork, StoreError};

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Uuid, Account>,
    transactions: Vec<TransactionEntry>,
    failing_commits: u32,
    units_started: u64,
}

/// Ledger held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open an account with a starting balance
    pub fn open_account(&self, account_id: Uuid, balance: Balance) -> Account {
        let account = Account::new(account_id, balance);
        self.lock().accounts.insert(account_id, account.clone());
        account
    }

    pub fn account(&self, account_id: Uuid) -> Option<Account> {
        self.lock().accounts.get(&account_id).cloned()
    }

    /// All committed transaction entries, oldest first
    pub fn transactions(&self) -> Vec<TransactionEntry> {
        self.lock().transactions.clone()
    }

    /// Number of units of work opened so far
    pub fn units_started(&self) -> u64 {
        self.lock().units_started
    }

    /// Make the next `count` commits fail with a transient error
    pub fn fail_next_commits(&self, count: u32) {
        self.lock().failing_commits = count;
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError> {
        self.lock().units_started += 1;
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            staged_accounts: HashMap::new(),
            staged_transactions: Vec::new(),
        }))
    }
}

struct InMemoryUnitOfWork {
    store: InMemoryLedgerStore,
    staged_accounts: HashMap<Uuid, Account>,
    staged_transactions: Vec<TransactionEntry>,
}

#[async_trait]
impl LedgerUnitOfWork for InMemoryUnitOfWork {
    async fn find_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        if let Some(account) = self.staged_accounts.get(&account_id) {
            return Ok(Some(account.clone()));
        }
        Ok(self.store.account(account_id))
    }

    async fn transaction_for_message(
        &mut self,
        message_id: Uuid,
    ) -> Result<Option<TransactionEntry>, StoreError> {
        let staged = self
            .staged_transactions
            .iter()
            .find(|t| t.message_id == Some(message_id))
            .cloned();
        if staged.is_some() {
            return Ok(staged);
        }

        Ok(self
            .store
            .lock()
            .transactions
            .iter()
            .find(|t| t.message_id == Some(message_id))
            .cloned())
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.staged_accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_transaction(&mut self, entry: &TransactionEntry) -> Result<(), StoreError> {
        self.staged_transactions.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork {
            store,
            staged_accounts,
            staged_transactions,
        } = *self;
        let mut state = store.lock();

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::Unavailable(
                "simulated connection loss during commit".to_string(),
            ));
        }

        state.accounts.extend(staged_accounts);
        state.transactions.extend(staged_transactions);
        Ok(())
    }
}
