//! Fire-and-forget task pool with bounded concurrency

use std::future::Future;
use std::sync::Arc;

use bulkhead_errors::{Error, Result};
use bulkhead_gate::AdmissionGate;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Hook invoked with errors from task bodies
pub type TaskErrorHook = Arc<dyn Fn(Error) + Send + Sync>;

/// A task pool that admits at most `capacity` concurrent task bodies
///
/// Submission waits for a permit, then spawns the task on the pool's
/// runtime handle. The permit travels inside the spawned future and is
/// returned when the body finishes, whether it succeeds, fails, or
/// panics.
///
/// Errors raised by task bodies are intercepted and routed to the
/// [`on_task_error`](BoundedTaskPool::on_task_error) hook; they never
/// propagate through the returned join handle. The default hook logs at
/// debug level and discards the error. This fire-and-forget isolation
/// is deliberate: one failing task must not take the pool down, and a
/// caller who needs failures to be observable wires a hook.
///
/// The runtime handle is owned by the caller; the pool never shuts it
/// down.
pub struct BoundedTaskPool {
    gate: Arc<AdmissionGate>,
    runtime: Handle,
    on_task_error: Option<TaskErrorHook>,
}

impl BoundedTaskPool {
    /// Create a pool with the given capacity (`None` = unbounded)
    ///
    /// The pool uses a fair gate, so submissions acquire permits in
    /// FIFO order.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        let gate = AdmissionGate::new(capacity)
            .with_fairness(true)
            .with_label("task submission");
        Self {
            gate: Arc::new(gate),
            runtime: Handle::current(),
            on_task_error: None,
        }
    }

    /// Create a pool over a caller-provided gate
    ///
    /// Useful when several pools should compete for the same permits.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_gate(gate: Arc<AdmissionGate>) -> Self {
        Self {
            gate,
            runtime: Handle::current(),
            on_task_error: None,
        }
    }

    /// Spawn tasks on a specific runtime handle
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = runtime;
        self
    }

    /// Set the hook that receives errors from task bodies
    #[must_use]
    pub fn on_task_error(mut self, hook: impl Fn(Error) + Send + Sync + 'static) -> Self {
        self.on_task_error = Some(Arc::new(hook));
        self
    }

    /// Submit a task, waiting for a permit first
    ///
    /// The returned handle resolves to `()` when the body has finished;
    /// it never carries the body's error. The permit is released when
    /// the body completes, including by panic.
    ///
    /// # Errors
    ///
    /// Returns an admission error if the pool's gate is closed or the
    /// wait for a permit is cancelled. Once the task is spawned it runs
    /// to completion; there is no mid-flight cancellation.
    pub async fn submit<F>(&self, task: F) -> Result<JoinHandle<()>>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let permit = self.gate.acquire().await?;
        let hook = self.on_task_error.clone();

        Ok(self.runtime.spawn(async move {
            let _permit = permit;
            if let Err(error) = task.await {
                match &hook {
                    Some(hook) => hook(error),
                    None => debug!(%error, "task failed; discarding per pool policy"),
                }
            }
        }))
    }

    /// Number of task bodies currently running
    ///
    /// Capacity minus available permits: a best-effort, inherently racy
    /// gauge, not a snapshot guarantee. Unbounded pools report 0.
    #[must_use]
    pub fn concurrent_tasks(&self) -> usize {
        self.gate.in_use()
    }

    /// Wait until no task body is executing
    ///
    /// Acquires all permits, then releases them. This is a drain
    /// barrier, not a terminal shutdown: the pool remains usable
    /// afterward. On an unbounded pool this returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an admission error if the gate closes during the drain.
    pub async fn await_termination(&self) -> Result<()> {
        let Some(capacity) = self.gate.capacity() else {
            return Ok(());
        };

        let mut held = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            held.push(self.gate.acquire().await?);
        }
        drop(held);
        Ok(())
    }

    /// The gate backing this pool
    #[must_use]
    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }
}
