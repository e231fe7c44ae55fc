//! PostgreSQL ledger store
//!
//! Each unit of work is one database transaction. The account row is locked
//! with `SELECT ... FOR UPDATE` so concurrent writers to the same account are
//! serialized by the database, not by this process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, Balance, InstructionKind, TransactionEntry};

use super::{LedgerStore, LedgerUnitOfWork, StoreError};

/// Ledger backed by the `bank_accounts` and `transactions` tables
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an account row (used for seeding and tests)
    pub async fn open_account(&self, account_id: Uuid, balance: Balance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bank_accounts (id, balance)
            VALUES ($1, $2)
            "#,
        )
        .bind(account_id)
        .bind(balance.value())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read an account outside any unit of work
    pub async fn account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<(Uuid, Decimal)> =
            sqlx::query_as("SELECT id, balance FROM bank_accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(account_from_row).transpose()
    }

    /// Committed entries for an account, oldest first
    pub async fn transactions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TransactionEntry>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, bank_account_id, message_id, amount, transaction_type, "timestamp"
            FROM transactions
            WHERE bank_account_id = $1
            ORDER BY "timestamp"
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

type TransactionRow = (Uuid, Uuid, Option<Uuid>, Decimal, String, DateTime<Utc>);

fn account_from_row((id, balance): (Uuid, Decimal)) -> Result<Account, StoreError> {
    let balance = Balance::new(balance)
        .map_err(|e| StoreError::InvalidRecord(format!("account {}: {}", id, e)))?;
    Ok(Account::new(id, balance))
}

fn entry_from_row(
    (id, account_id, message_id, amount, kind, timestamp): TransactionRow,
) -> Result<TransactionEntry, StoreError> {
    let kind: InstructionKind = kind
        .parse()
        .map_err(|e| StoreError::InvalidRecord(format!("transaction {}: {}", id, e)))?;

    Ok(TransactionEntry {
        id,
        account_id,
        message_id,
        amount,
        kind,
        timestamp,
    })
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnitOfWork for PgUnitOfWork {
    async fn find_account(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<(Uuid, Decimal)> = sqlx::query_as(
            r#"
            SELECT id, balance
            FROM bank_accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn transaction_for_message(
        &mut self,
        message_id: Uuid,
    ) -> Result<Option<TransactionEntry>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, bank_account_id, message_id, amount, transaction_type, "timestamp"
            FROM transactions
            WHERE message_id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(entry_from_row).transpose()
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(account.balance.value())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::InvalidRecord(format!(
                "account {} vanished during update",
                account.id
            )));
        }

        Ok(())
    }

    async fn insert_transaction(&mut self, entry: &TransactionEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, bank_account_id, message_id, amount, transaction_type, "timestamp"
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.account_id)
        .bind(entry.message_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(entry.timestamp)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
