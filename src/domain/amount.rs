//! Amount type
//!
//! Domain primitives for monetary values. Amounts are validated at
//! construction time so an invalid instruction amount cannot reach the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value a `NUMERIC(18, 2)` ledger column can hold
const MAX_AMOUNT: &str = "9999999999999999.99";

/// Maximum decimal places (ledger columns are NUMERIC(18, 2))
pub const MAX_SCALE: u32 = 2;

fn max_amount() -> Decimal {
    Decimal::from_str(MAX_AMOUNT).unwrap_or(Decimal::MAX)
}

/// Amount represents a validated credit or debit value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 2 decimal places
/// - Fits a `NUMERIC(18, 2)` column
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use banking_event_receiver::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(10050, 2)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(10050, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Balance cannot be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value does not fit the ledger column
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        // Trailing zeros ("100.500") are not extra precision
        let normalized = value.normalize();
        if normalized.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(normalized.scale()));
        }

        if value > max_amount() {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create an Amount from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.2}", amount.0)
    }
}

/// Balance represents an account balance (zero or positive).
/// Unlike Amount, Balance can be zero. It is bounded by the same ledger
/// column limit as Amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }
        if value > max_amount() {
            return Err(AmountError::Overflow);
        }
        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a debit of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let total = self
            .0
            .checked_add(amount.value())
            .ok_or(AmountError::Overflow)?;
        Balance::new(total)
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
