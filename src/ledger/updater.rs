//! Ledger Updater
//!
//! Applies one validated credit or debit inside a single unit of work:
//! the balance update and the transaction entry commit together or not at all.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{DomainError, FailureKind, InstructionKind, TransactionEntry, ValidatedEvent};

use super::{LedgerStoreBox, StoreError};

/// Result of a successfully applied event
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedResult {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub kind: InstructionKind,
    pub amount: Decimal,
    /// Balance after the unit of work committed
    pub balance: Decimal,
    /// The message had already been applied; nothing was written
    pub duplicate: bool,
}

/// Failure to apply an event
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Bank account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Insufficient funds in account {account_id}: required {required}, available {available}")]
    InsufficientFunds {
        account_id: Uuid,
        required: Decimal,
        available: Decimal,
    },

    #[error("Balance overflow in account {0}")]
    BalanceOverflow(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApplyError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ApplyError::Store(e) if e.is_transient() => FailureKind::Transient,
            _ => FailureKind::BusinessRule,
        }
    }
}

impl From<DomainError> for ApplyError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                account_id,
                required,
                available,
            } => ApplyError::InsufficientFunds {
                account_id,
                required,
                available,
            },
            DomainError::BalanceOverflow(account_id) => ApplyError::BalanceOverflow(account_id),
        }
    }
}

/// Applies validated events to the ledger
pub struct LedgerUpdater {
    store: LedgerStoreBox,
}

impl LedgerUpdater {
    pub fn new(store: LedgerStoreBox) -> Self {
        Self { store }
    }

    /// Apply `event`, delivered by queue message `message_id`.
    ///
    /// A message that already produced a committed entry is reported as a
    /// duplicate without touching the balance again.
    pub async fn apply(
        &self,
        event: &ValidatedEvent,
        message_id: Uuid,
    ) -> Result<AppliedResult, ApplyError> {
        let mut uow = self.store.begin().await?;

        let account = match uow.find_account(event.account_id).await? {
            Some(account) => account,
            None => {
                tracing::error!(account_id = %event.account_id, "Bank account not found");
                return Err(ApplyError::AccountNotFound(event.account_id));
            }
        };

        if let Some(existing) = uow.transaction_for_message(message_id).await? {
            tracing::warn!(
                message_id = %message_id,
                transaction_id = %existing.id,
                "Message already applied to ledger, skipping mutation"
            );
            return Ok(AppliedResult {
                transaction_id: existing.id,
                account_id: account.id,
                kind: existing.kind,
                amount: existing.amount,
                balance: account.balance.value(),
                duplicate: true,
            });
        }

        let entry = TransactionEntry::record(event, message_id);

        let updated = account.apply(event.kind, &event.amount).map_err(|e| {
            tracing::error!(account_id = %account.id, error = %e, "Rejected ledger instruction");
            ApplyError::from(e)
        })?;

        uow.save_account(&updated).await?;
        uow.insert_transaction(&entry).await?;
        uow.commit().await?;

        match event.kind {
            InstructionKind::Credit => tracing::info!(
                account_id = %updated.id,
                amount = %event.amount,
                balance = %updated.balance,
                "Credited account"
            ),
            InstructionKind::Debit => tracing::info!(
                account_id = %updated.id,
                amount = %event.amount,
                balance = %updated.balance,
                "Debited account"
            ),
        }

        Ok(AppliedResult {
            transaction_id: entry.id,
            account_id: updated.id,
            kind: event.kind,
            amount: entry.amount,
            balance: updated.balance.value(),
            duplicate: false,
        })
    }
}
