//! Ledger entities
//!
//! `Account` holds the balance; `TransactionEntry` is the append-only audit
//! record written alongside every applied event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, AmountError, Balance, DomainError, InstructionKind, ValidatedEvent};
use rust_decimal::Decimal;

/// Bank account as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub balance: Balance,
}

impl Account {
    pub fn new(id: Uuid, balance: Balance) -> Self {
        Self { id, balance }
    }

    /// Return the account as it would be after applying `amount`.
    ///
    /// Credits never take the balance past what the ledger column holds;
    /// debits never take it below zero.
    pub fn apply(&self, kind: InstructionKind, amount: &Amount) -> Result<Account, DomainError> {
        let balance = match kind {
            InstructionKind::Credit => self
                .balance
                .credit(amount)
                .map_err(|_| DomainError::BalanceOverflow(self.id))?,
            InstructionKind::Debit => {
                if !self.balance.is_sufficient_for(amount) {
                    return Err(DomainError::insufficient_funds(
                        self.id,
                        amount.value(),
                        self.balance.value(),
                    ));
                }
                self.balance.debit(amount).map_err(|e| match e {
                    AmountError::Negative(_) => DomainError::insufficient_funds(
                        self.id,
                        amount.value(),
                        self.balance.value(),
                    ),
                    _ => DomainError::BalanceOverflow(self.id),
                })?
            }
        };

        Ok(Account {
            id: self.id,
            balance,
        })
    }
}

/// Audit record of one applied event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Queue message that produced this entry (dedup key)
    pub message_id: Option<Uuid>,
    pub amount: Decimal,
    pub kind: InstructionKind,
    pub timestamp: DateTime<Utc>,
}

impl TransactionEntry {
    /// Build the entry for an event delivered by `message_id`
    pub fn record(event: &ValidatedEvent, message_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: event.account_id,
            message_id: Some(message_id),
            amount: event.amount.value(),
            kind: event.kind,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account_with(balance: Decimal) -> Account {
        Account::new(Uuid::new_v4(), Balance::new(balance).unwrap())
    }

    #[test]
    fn test_credit_adds_to_balance() {
        let account = account_with(dec!(1000));
        let updated = account
            .apply(InstructionKind::Credit, &Amount::from_integer(100).unwrap())
            .unwrap();

        assert_eq!(updated.balance.value(), dec!(1100));
        assert_eq!(updated.id, account.id);
    }

    #[test]
    fn test_debit_subtracts_from_balance() {
        let account = account_with(dec!(1000));
        let updated = account
            .apply(InstructionKind::Debit, &Amount::from_integer(1000).unwrap())
            .unwrap();

        assert_eq!(updated.balance.value(), Decimal::ZERO);
    }

    #[test]
    fn test_debit_over_balance_rejected() {
        let account = account_with(dec!(99.99));
        let result = account.apply(InstructionKind::Debit, &Amount::from_integer(100).unwrap());

        match result {
            Err(DomainError::InsufficientFunds {
                required,
                available,
                ..
            }) => {
                assert_eq!(required, dec!(100));
                assert_eq!(available, dec!(99.99));
            }
            other => panic!("Expected InsufficientFunds, got: {:?}", other),
        }
        // original untouched
        assert_eq!(account.balance.value(), dec!(99.99));
    }

    #[test]
    fn test_transaction_entry_record() {
        let message_id = Uuid::new_v4();
        let event = ValidatedEvent {
            event_id: None,
            account_id: Uuid::new_v4(),
            amount: Amount::from_integer(5).unwrap(),
            kind: InstructionKind::Debit,
            attempt_count: 1,
        };

        let entry = TransactionEntry::record(&event, message_id);
        assert_eq!(entry.account_id, event.account_id);
        assert_eq!(entry.message_id, Some(message_id));
        assert_eq!(entry.amount, dec!(5));
        assert_eq!(entry.kind, InstructionKind::Debit);
    }
}
