//! Event records
//!
//! The credit/debit instruction carried by a queue message, before and after
//! validation.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

use super::Amount;

/// Direction of a ledger instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Credit,
    Debit,
}

impl InstructionKind {
    /// Numeric code used by producers that send the kind as an integer
    pub fn code(self) -> i64 {
        match self {
            InstructionKind::Credit => 0,
            InstructionKind::Debit => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstructionKind::Credit => "credit",
            InstructionKind::Debit => "debit",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstructionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("credit") {
            Ok(InstructionKind::Credit)
        } else if s.eq_ignore_ascii_case("debit") {
            Ok(InstructionKind::Debit)
        } else {
            Err(format!("unrecognized instruction kind: {}", s))
        }
    }
}

/// Instruction kind exactly as it appeared on the wire.
///
/// Unknown codes still decode; rejecting them is the validator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindCode {
    Code(i64),
    Name(String),
}

impl KindCode {
    /// Map the wire value onto a known kind
    pub fn recognize(&self) -> Option<InstructionKind> {
        match self {
            KindCode::Code(0) => Some(InstructionKind::Credit),
            KindCode::Code(1) => Some(InstructionKind::Debit),
            KindCode::Code(_) => None,
            KindCode::Name(name) => name.parse().ok(),
        }
    }
}

impl From<InstructionKind> for KindCode {
    fn from(kind: InstructionKind) -> Self {
        KindCode::Name(kind.as_str().to_string())
    }
}

impl fmt::Display for KindCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindCode::Code(code) => write!(f, "{}", code),
            KindCode::Name(name) => f.write_str(name),
        }
    }
}

/// Decoded event payload.
///
/// Field names follow snake_case; the PascalCase spelling used by the
/// upstream producer is accepted as well. Missing fields fall back to empty
/// values so that the validator, not the decoder, reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, alias = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, alias = "BankAccountId")]
    pub bank_account_id: Uuid,

    #[serde(default, alias = "Amount", deserialize_with = "exact_decimal")]
    pub amount: Decimal,

    #[serde(default, alias = "MessageType", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<KindCode>,

    /// Prior deliveries of the carrying message; filled from the transport
    #[serde(skip)]
    pub attempt_count: u32,
}

impl EventRecord {
    pub fn new(bank_account_id: Uuid, amount: Decimal, kind: InstructionKind) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            bank_account_id,
            amount,
            message_type: Some(kind.into()),
            attempt_count: 0,
        }
    }

    pub fn credit(bank_account_id: Uuid, amount: Decimal) -> Self {
        Self::new(bank_account_id, amount, InstructionKind::Credit)
    }

    pub fn debit(bank_account_id: Uuid, amount: Decimal) -> Self {
        Self::new(bank_account_id, amount, InstructionKind::Debit)
    }

    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    /// Encode as the JSON payload a producer would publish
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Read an amount from its source text, whether sent as a JSON number or
/// string. Numbers never pass through `f64`.
fn exact_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Box<RawValue> = Deserialize::deserialize(deserializer)?;
    let text = raw.get().trim();

    let literal = if text.starts_with('"') {
        serde_json::from_str::<String>(text).map_err(D::Error::custom)?
    } else {
        text.to_string()
    };

    let parsed = if literal.contains(|c| c == 'e' || c == 'E') {
        Decimal::from_scientific(&literal)
    } else {
        Decimal::from_str_exact(&literal)
    };
    parsed.map_err(|e| D::Error::custom(format!("invalid amount {}: {}", literal, e)))
}

/// An event that passed validation and can be handed to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub event_id: Option<Uuid>,
    pub account_id: Uuid,
    pub amount: Amount,
    pub kind: InstructionKind,
    pub attempt_count: u32,
}
