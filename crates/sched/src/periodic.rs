//! Single-task periodic runner with drift-free sleep

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use bulkhead_errors::{Result, SchedError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

/// A self-rescheduling periodic runner
///
/// Spawning starts a dedicated loop: record the start time, run the
/// body, then sleep `period - elapsed`. A body that overruns the period
/// shortens or eliminates the gap before the next run; there is no
/// catch-up beyond that. Body errors are logged and the loop continues.
///
/// [`shutdown`](PeriodicTask::shutdown) wakes a sleeping loop early;
/// an iteration already in progress finishes before exit.
pub struct PeriodicTask {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    last_run: Arc<Mutex<Option<Instant>>>,
}

impl PeriodicTask {
    /// Start a periodic loop on a dedicated tokio task
    ///
    /// The body runs immediately, then once per `period`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut body: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let (stop, mut stopped) = watch::channel(false);
        let last_run = Arc::new(Mutex::new(None));
        let tracker = Arc::clone(&last_run);

        let handle = tokio::spawn(async move {
            loop {
                if *stopped.borrow_and_update() {
                    break;
                }

                let started = Instant::now();
                *lock(&tracker) = Some(started);
                if let Err(error) = body().await {
                    warn!(task = %name, %error, "periodic iteration failed");
                }

                // a slow body reruns immediately; no further correction
                let Some(remaining) = period.checked_sub(started.elapsed()) else {
                    continue;
                };

                tokio::select! {
                    () = sleep(remaining) => {}
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(task = %name, "periodic task exited");
        });

        Self {
            stop,
            handle: Some(handle),
            last_run,
        }
    }

    /// Stop the loop and wait for it to exit
    ///
    /// Wakes the loop if it is sleeping; an iteration in progress runs
    /// to completion first.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::AlreadyShutdown`] on a second call, or
    /// [`SchedError::JoinFailed`] if the loop task panicked.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Err(SchedError::AlreadyShutdown.into());
        };

        let _ = self.stop.send(true);
        handle.await.map_err(|error| SchedError::JoinFailed {
            message: error.to_string(),
        })?;
        Ok(())
    }

    /// When the body last started running
    ///
    /// Exposed for health and liveness checks; `None` before the first
    /// run.
    #[must_use]
    pub fn last_execution_time(&self) -> Option<Instant> {
        *lock(&self.last_run)
    }

    /// Whether the loop is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use bulkhead_errors::Error;

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_sleep_returns_promptly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut task = PeriodicTask::spawn("ticker", Duration::from_secs(3600), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        // let the first iteration run and the loop park in its sleep
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let before = Instant::now();
        task.shutdown().await.expect("shutdown");
        assert_eq!(
            Instant::now(),
            before,
            "shutdown must not wait out the period"
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_are_spaced_by_period_minus_elapsed() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&starts);
        let mut task = PeriodicTask::spawn("spaced", Duration::from_millis(100), move || {
            let recorder = Arc::clone(&recorder);
            async move {
                lock(&recorder).push(Instant::now());
                sleep(Duration::from_millis(40)).await;
                Ok(())
            }
        });

        sleep(Duration::from_millis(450)).await;
        task.shutdown().await.expect("shutdown");

        let starts = lock(&starts).clone();
        assert!(starts.len() >= 4, "expected several runs, got {}", starts.len());
        for pair in starts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_body_reruns_immediately_without_catchup() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&starts);
        let mut task = PeriodicTask::spawn("overrun", Duration::from_millis(100), move || {
            let recorder = Arc::clone(&recorder);
            async move {
                lock(&recorder).push(Instant::now());
                sleep(Duration::from_millis(250)).await;
                Ok(())
            }
        });

        sleep(Duration::from_millis(900)).await;
        task.shutdown().await.expect("shutdown");

        let starts = lock(&starts).clone();
        assert!(starts.len() >= 3, "expected several runs, got {}", starts.len());
        for pair in starts.windows(2) {
            // back to back: the 250ms body swallowed the whole period
            assert_eq!(pair[1] - pair[0], Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn body_errors_do_not_stop_the_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut task = PeriodicTask::spawn("flaky", Duration::from_millis(50), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::internal("iteration failed"))
            }
        });

        sleep(Duration::from_millis(220)).await;
        task.shutdown().await.expect("shutdown");
        assert!(runs.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn last_execution_time_tracks_runs() {
        let mut task =
            PeriodicTask::spawn("tracked", Duration::from_millis(100), || async { Ok(()) });

        tokio::task::yield_now().await;
        let first = task.last_execution_time().expect("first run recorded");

        sleep(Duration::from_millis(150)).await;
        let second = task.last_execution_time().expect("second run recorded");
        assert!(second > first);

        task.shutdown().await.expect("shutdown");
        let err = task.shutdown().await.expect_err("second shutdown");
        assert!(matches!(
            err,
            Error::Sched(SchedError::AlreadyShutdown)
        ));
    }
}
