//! Periodic scheduler error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedError {
    #[error("periodic task already shut down")]
    AlreadyShutdown,

    #[error("periodic task failed to join: {message}")]
    JoinFailed { message: String },
}
