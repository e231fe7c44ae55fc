//! Event Decoder
//!
//! Turns a raw queue payload into an `EventRecord`.

use crate::domain::{EventRecord, FailureKind};

/// Payload could not be turned into an event record.
///
/// Always permanent: the same bytes will never parse on redelivery.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Empty message body")]
    Empty,

    #[error("Malformed message body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl DecodeError {
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::Malformed
    }
}

/// Decode a JSON payload into an event record
pub fn decode(payload: &[u8]) -> Result<EventRecord, DecodeError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        tracing::error!("Error deserializing message body: payload is empty");
        return Err(DecodeError::Empty);
    }

    serde_json::from_slice(payload).map_err(|e| {
        tracing::error!(error = %e, "Error deserializing message body");
        DecodeError::Malformed(e)
    })
}
