//! Admission control error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdmissionError {
    #[error("cancelled while waiting for {operation}")]
    Cancelled { operation: String },

    #[error("admission gate is closed")]
    GateClosed,

    #[error("invalid capacity: {message}")]
    InvalidCapacity { message: String },
}
