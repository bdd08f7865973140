#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the bulkhead concurrency toolkit
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone for easier handling across task
//! boundaries.

use thiserror::Error;

pub mod admission;
pub mod pool;
pub mod resource;
pub mod sched;

// Re-export all error types at the root
pub use admission::AdmissionError;
pub use pool::PoolError;
pub use resource::ResourceError;
pub use sched::SchedError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("scheduler error: {0}")]
    Sched(#[from] SchedError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error stems from a cancelled or interrupted wait
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Admission(AdmissionError::Cancelled { .. })
        )
    }
}

/// Result type alias for bulkhead operations
pub type Result<T> = std::result::Result<T, Error>;
