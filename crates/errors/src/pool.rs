//! Task pool and worker queue error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolError {
    #[error("pool is closed")]
    Closed,

    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    #[error("submission failed: {message}")]
    SubmitFailed { message: String },

    #[error("results sink failed: {message}")]
    SinkFailed { message: String },

    #[error("handoff abandoned before a worker took the item")]
    HandoffAbandoned,

    #[error("drain failed: {message}")]
    DrainFailed { message: String },
}
