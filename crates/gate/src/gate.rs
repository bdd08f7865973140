//! Resizable counting permit pool with scoped acquire/release

use std::sync::Arc;

use bulkhead_errors::{AdmissionError, Error, Result};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::limits::GateLimits;
use crate::semaphore::{acquire_permit, create_permit_pool, try_acquire_permit};

/// Snapshot of the active permit pool
///
/// Resizing installs a fresh pool; permits already handed out keep a
/// reference to the pool they came from and drain against it.
#[derive(Clone, Debug)]
struct PoolSlot {
    capacity: Option<usize>,
    semaphore: Option<Arc<Semaphore>>,
    closed: bool,
}

impl PoolSlot {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            semaphore: capacity.map(create_permit_pool),
            closed: false,
        }
    }
}

/// A resizable counting permit pool with scoped acquire/release
///
/// The gate admits at most `capacity` concurrent permit holders
/// (`None` = unbounded, never waits). Waiters are served FIFO when the
/// gate is fair; an unfair gate lets arrivals barge via a fast path
/// whenever a permit happens to be free.
///
/// Closing the gate wakes every waiter with a cancellation error and
/// fails all subsequent acquisitions. The gate never retries a failed
/// acquisition internally; that decision belongs to the caller.
#[derive(Debug)]
pub struct AdmissionGate {
    pool: watch::Sender<PoolSlot>,
    fair: bool,
    label: String,
}

impl AdmissionGate {
    /// Create an unfair gate with the given capacity (`None` = unbounded)
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        let (pool, _) = watch::channel(PoolSlot::new(capacity));
        Self {
            pool,
            fair: false,
            label: "permit".to_string(),
        }
    }

    /// Create a gate from a limits configuration
    #[must_use]
    pub fn from_limits(limits: &GateLimits) -> Self {
        Self::new(limits.capacity).with_fairness(limits.fair)
    }

    /// Set FIFO ordering among waiters
    #[must_use]
    pub fn with_fairness(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// Set the operation label used in cancellation errors
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Acquire a permit, waiting until one is free
    ///
    /// An unbounded gate returns an immediate no-op permit. If the gate
    /// is resized while this caller waits, the wait retargets the new
    /// pool; a permit already granted from the old pool stays valid and
    /// drains against the old pool on release.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::GateClosed`] if the gate was closed
    /// before this call, or [`AdmissionError::Cancelled`] if it closes
    /// while this caller is waiting.
    pub async fn acquire(&self) -> Result<Permit> {
        let mut rx = self.pool.subscribe();
        let mut waited = false;

        loop {
            let slot = rx.borrow_and_update().clone();
            if slot.closed {
                if waited {
                    return Err(AdmissionError::Cancelled {
                        operation: self.label.clone(),
                    }
                    .into());
                }
                return Err(AdmissionError::GateClosed.into());
            }

            let Some(semaphore) = slot.semaphore else {
                return Ok(Permit::unbounded());
            };

            if !self.fair {
                if let Some(permit) = try_acquire_permit(&semaphore)? {
                    return Ok(permit);
                }
            }

            waited = true;
            tokio::select! {
                granted = acquire_permit(Arc::clone(&semaphore), &self.label) => {
                    match granted {
                        Ok(permit) => return Ok(permit),
                        // The pool underneath us was closed; re-read the
                        // slot to distinguish close from a stale snapshot.
                        Err(_) => continue,
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(AdmissionError::Cancelled {
                            operation: self.label.clone(),
                        }
                        .into());
                    }
                }
            }
        }
    }

    /// Try to acquire a permit without waiting
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::GateClosed`] if the gate is closed.
    pub fn try_acquire(&self) -> Result<Option<Permit>> {
        let slot = self.pool.borrow().clone();
        if slot.closed {
            return Err(AdmissionError::GateClosed.into());
        }
        match slot.semaphore {
            None => Ok(Some(Permit::unbounded())),
            Some(semaphore) => try_acquire_permit(&semaphore),
        }
    }

    /// Replace the active permit pool
    ///
    /// Acquisitions not yet granted retarget the new pool. Permits
    /// already held drain against the old pool, so total concurrency can
    /// transiently exceed the new capacity until old holders release.
    /// That window is accepted behavior, not silently corrected.
    ///
    /// Resizing a closed gate is a no-op.
    pub fn resize(&self, new_capacity: Option<usize>) {
        self.pool.send_modify(|slot| {
            if slot.closed {
                return;
            }
            slot.capacity = new_capacity;
            slot.semaphore = new_capacity.map(create_permit_pool);
        });
    }

    /// Close the gate
    ///
    /// Every parked waiter is woken with a cancellation error and all
    /// future acquisitions fail. Permits already held remain valid and
    /// release as usual.
    pub fn close(&self) {
        self.pool.send_modify(|slot| {
            slot.closed = true;
            if let Some(semaphore) = &slot.semaphore {
                semaphore.close();
            }
        });
    }

    /// Whether the gate has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.borrow().closed
    }

    /// Current capacity (`None` = unbounded)
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.pool.borrow().capacity
    }

    /// Permits currently available (`None` = unbounded)
    ///
    /// A racy gauge: the value may be stale by the time the caller
    /// inspects it.
    #[must_use]
    pub fn available(&self) -> Option<usize> {
        self.pool
            .borrow()
            .semaphore
            .as_ref()
            .map(|semaphore| semaphore.available_permits())
    }

    /// Permits currently held, i.e. capacity minus available
    ///
    /// Best-effort and inherently racy; returns 0 for unbounded gates.
    /// Permits still draining against a replaced pool are not counted.
    #[must_use]
    pub fn in_use(&self) -> usize {
        let slot = self.pool.borrow();
        match (&slot.capacity, &slot.semaphore) {
            (Some(capacity), Some(semaphore)) => {
                capacity.saturating_sub(semaphore.available_permits())
            }
            _ => 0,
        }
    }
}

/// A scoped permit handle
///
/// Holds one permit from an [`AdmissionGate`]. The permit is returned
/// when [`release`](Permit::release) is called or the handle is dropped,
/// whichever happens first; releasing twice is a no-op. Permits from an
/// unbounded gate carry nothing and never block anyone.
#[derive(Debug)]
#[must_use = "dropping the permit releases it immediately"]
pub struct Permit {
    inner: Option<OwnedSemaphorePermit>,
}

impl Permit {
    pub(crate) fn bounded(permit: OwnedSemaphorePermit) -> Self {
        Self {
            inner: Some(permit),
        }
    }

    pub(crate) fn unbounded() -> Self {
        Self { inner: None }
    }

    /// Return the permit to its pool; idempotent
    pub fn release(&mut self) {
        self.inner.take();
    }
}
