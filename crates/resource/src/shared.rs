//! Shared ownership of a closeable resource, closed exactly once

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use async_trait::async_trait;
use bulkhead_errors::{ResourceError, Result};

/// A resource that can be torn down asynchronously
///
/// `close` is expected to terminate cleanly; it is invoked at most once
/// per resource by [`RefCounted`].
#[async_trait]
pub trait Closeable: Send + Sync {
    async fn close(&self) -> Result<()>;
}

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Shared ownership of a [`Closeable`], closed exactly once
///
/// Owners register through [`acquire`](RefCounted::acquire) and
/// deregister through [`release`](RefCounted::release). The release
/// that drops the count from 1 to 0 races a compare-and-swap from Open
/// to Closing; the single winner runs `close()` and marks the resource
/// Closed. Close duration never blocks acquire/release traffic, extra
/// releases are rejected rather than re-entering close, and acquisition
/// after teardown has begun fails.
///
/// Owners must hold a reference for as long as they use the resource;
/// acquiring without holding one (other than the very first acquire)
/// races teardown.
pub struct RefCounted<R: Closeable> {
    resource: R,
    refs: AtomicUsize,
    state: AtomicU8,
}

impl<R: Closeable> RefCounted<R> {
    /// Wrap a resource with a reference count of zero
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            refs: AtomicUsize::new(0),
            state: AtomicU8::new(OPEN),
        }
    }

    /// Register an owner; returns the new reference count
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Closed`] once teardown has begun.
    pub fn acquire(&self) -> Result<usize> {
        let mut current = self.refs.load(Ordering::Acquire);
        loop {
            if self.state.load(Ordering::Acquire) != OPEN {
                return Err(ResourceError::Closed.into());
            }
            match self.refs.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current + 1),
                Err(observed) => current = observed,
            }
        }
    }

    /// Deregister an owner; returns the remaining reference count
    ///
    /// The release that reaches zero closes the resource. Any close
    /// error surfaces to that caller; the resource counts as closed
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::OverReleased`] when there is no
    /// outstanding reference to give back, and
    /// [`ResourceError::CloseFailed`] if this release triggered a close
    /// that failed.
    pub async fn release(&self) -> Result<usize> {
        let mut current = self.refs.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(ResourceError::OverReleased.into());
            }
            match self.refs.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let remaining = current - 1;
        if remaining == 0
            && self
                .state
                .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            let outcome = self.resource.close().await;
            self.state.store(CLOSED, Ordering::Release);
            outcome.map_err(|error| ResourceError::CloseFailed {
                message: error.to_string(),
            })?;
        }
        Ok(remaining)
    }

    /// Current reference count; a racy gauge
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Whether teardown has begun or finished
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) != OPEN
    }

    /// Access the wrapped resource
    ///
    /// The caller must hold a reference acquired through
    /// [`acquire`](RefCounted::acquire).
    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkhead_errors::Error;
    use std::sync::Arc;

    struct CountingResource {
        closes: AtomicUsize,
        fail_close: bool,
    }

    impl CountingResource {
        fn new() -> Self {
            Self {
                closes: AtomicUsize::new(0),
                fail_close: false,
            }
        }

        fn failing() -> Self {
            Self {
                closes: AtomicUsize::new(0),
                fail_close: true,
            }
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Closeable for CountingResource {
        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(Error::internal("close exploded"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn closes_exactly_once_on_last_release() {
        let shared = RefCounted::new(CountingResource::new());

        for expected in 1..=3usize {
            assert_eq!(shared.acquire().expect("acquire"), expected);
        }

        assert_eq!(shared.release().await.expect("release"), 2);
        assert_eq!(shared.resource().close_count(), 0);
        assert_eq!(shared.release().await.expect("release"), 1);
        assert_eq!(shared.resource().close_count(), 0);
        assert_eq!(shared.release().await.expect("release"), 0);
        assert_eq!(shared.resource().close_count(), 1);
        assert!(shared.is_closed());
    }

    #[tokio::test]
    async fn over_release_is_rejected_without_reclosing() {
        let shared = RefCounted::new(CountingResource::new());
        shared.acquire().expect("acquire");
        shared.release().await.expect("release");
        assert_eq!(shared.resource().close_count(), 1);

        let err = shared.release().await.expect_err("over-release");
        assert!(matches!(
            err,
            Error::Resource(ResourceError::OverReleased)
        ));
        assert_eq!(shared.resource().close_count(), 1, "close not re-entered");
    }

    #[tokio::test]
    async fn acquire_after_close_is_rejected() {
        let shared = RefCounted::new(CountingResource::new());
        shared.acquire().expect("acquire");
        shared.release().await.expect("release");

        let err = shared.acquire().expect_err("closed resource");
        assert!(matches!(err, Error::Resource(ResourceError::Closed)));
    }

    #[tokio::test]
    async fn close_error_surfaces_to_triggering_release() {
        let shared = RefCounted::new(CountingResource::failing());
        shared.acquire().expect("acquire");

        let err = shared.release().await.expect_err("close failure");
        assert!(matches!(
            err,
            Error::Resource(ResourceError::CloseFailed { .. })
        ));
        assert!(shared.is_closed(), "closed despite the close error");
        assert_eq!(shared.resource().close_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_owners_close_exactly_once() {
        let shared = Arc::new(RefCounted::new(CountingResource::new()));

        // seed one reference so concurrent pairs never dip to zero early
        shared.acquire().expect("seed acquire");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    shared.acquire().expect("acquire");
                    shared.release().await.expect("release");
                }
            }));
        }
        for handle in handles {
            handle.await.expect("owner task");
        }

        assert_eq!(shared.resource().close_count(), 0);
        assert_eq!(shared.release().await.expect("final release"), 0);
        assert_eq!(shared.resource().close_count(), 1);
    }
}
