//! Metric engine error types

use thiserror::Error;

/// Link-quality engine errors
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("Unknown LQ algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] geolq_protocol::ProtocolError),
}

/// Result type for metric operations
pub type Result<T> = std::result::Result<T, MetricError>;
