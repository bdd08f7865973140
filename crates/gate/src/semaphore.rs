//! Permit-pool helpers
//!
//! Helper functions wrapping `tokio::sync::Semaphore` with the error
//! mapping used across the bulkhead crates.

use std::sync::Arc;

use bulkhead_errors::{AdmissionError, Error};
use tokio::sync::Semaphore;

use crate::gate::Permit;

/// Acquire a permit, waiting until one is free
///
/// A closed semaphore means the owning gate was shut down while this
/// caller was waiting; that surfaces as a cancellation error.
///
/// # Errors
///
/// Returns [`AdmissionError::Cancelled`] if the semaphore is closed.
pub async fn acquire_permit(semaphore: Arc<Semaphore>, operation: &str) -> Result<Permit, Error> {
    let permit = semaphore.acquire_owned().await.map_err(|_| {
        Error::from(AdmissionError::Cancelled {
            operation: operation.to_string(),
        })
    })?;
    Ok(Permit::bounded(permit))
}

/// Try to acquire a permit without waiting
///
/// Returns `Ok(Some(permit))` on success and `Ok(None)` if the pool is
/// currently exhausted.
///
/// # Errors
///
/// Returns [`AdmissionError::GateClosed`] if the semaphore is closed.
pub fn try_acquire_permit(semaphore: &Arc<Semaphore>) -> Result<Option<Permit>, Error> {
    match Arc::clone(semaphore).try_acquire_owned() {
        Ok(permit) => Ok(Some(Permit::bounded(permit))),
        Err(tokio::sync::TryAcquireError::NoPermits) => Ok(None),
        Err(tokio::sync::TryAcquireError::Closed) => Err(AdmissionError::GateClosed.into()),
    }
}

/// Create a permit pool with the specified number of permits
#[must_use]
pub fn create_permit_pool(permits: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(permits))
}
