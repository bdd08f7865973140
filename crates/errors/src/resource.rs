//! Reference-counted resource error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceError {
    #[error("resource is closed")]
    Closed,

    #[error("release called with no outstanding references")]
    OverReleased,

    #[error("resource close failed: {message}")]
    CloseFailed { message: String },
}
