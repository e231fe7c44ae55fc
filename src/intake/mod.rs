//! Intake module
//!
//! Decoding and validation of incoming event payloads.

mod decoder;
mod validator;

pub use decoder::{decode, DecodeError};
pub use validator::{validate, ValidationError};
