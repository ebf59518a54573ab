//! Error types for wire codec operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Truncated record: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Unknown IP version: {0}")]
    UnknownIpVersion(String),

    #[error("Address {address} does not fit IP version {version}")]
    AddressFamilyMismatch { address: String, version: String },
}
