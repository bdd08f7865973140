//! Result-collecting task pool with batched delivery

use std::future::Future;
use std::sync::Arc;

use bulkhead_errors::{Error, PoolError, Result};
use bulkhead_gate::AdmissionGate;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

/// Sink receiving batches of completed results
///
/// Called inline on the submitting or closing task, so it must not
/// block for long.
pub type BatchSink<T> = Box<dyn FnMut(Vec<Result<T>>) -> Result<()> + Send>;

/// A task pool that collects completed results into batches
///
/// Submission is gated by a permit pool of size `capacity`, bounding
/// how many task bodies run at once. Each submission also reaps any
/// already-finished tasks and hands them to the sink as one batch;
/// [`close`](ResultPool::close) drains everything still in flight and
/// delivers a final batch.
///
/// Every submitted task appears exactly once in a delivered batch, as
/// `Ok` or `Err`, unless the process is killed. There is no ordering
/// guarantee across results or batches.
pub struct ResultPool<T> {
    gate: Arc<AdmissionGate>,
    runtime: Handle,
    inflight: Vec<JoinHandle<Result<T>>>,
    sink: Option<BatchSink<T>>,
    closed: bool,
}

impl<T: Send + 'static> ResultPool<T> {
    /// Create a pool with the given capacity
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let gate = AdmissionGate::new(Some(capacity))
            .with_fairness(true)
            .with_label("result submission");
        Self {
            gate: Arc::new(gate),
            runtime: Handle::current(),
            inflight: Vec::new(),
            sink: None,
            closed: false,
        }
    }

    /// Set the sink that receives completed batches
    ///
    /// Without a sink, completed results are discarded on reap.
    #[must_use]
    pub fn with_sink(
        mut self,
        sink: impl FnMut(Vec<Result<T>>) -> Result<()> + Send + 'static,
    ) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Spawn tasks on a specific runtime handle
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = runtime;
        self
    }

    /// Submit a task, then deliver any already-completed results
    ///
    /// Waits for a permit, spawns the task, and tracks its handle. Any
    /// tasks that have finished by that point are reaped without
    /// waiting and delivered to the sink as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`close`](ResultPool::close),
    /// an admission error if the wait for a permit is cancelled, or
    /// [`PoolError::SinkFailed`] if the sink rejects the batch. A sink
    /// failure does not lose the submission itself.
    pub async fn submit<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        if self.closed {
            return Err(PoolError::Closed.into());
        }

        let permit = self.gate.acquire().await?;
        self.inflight.push(self.runtime.spawn(async move {
            let _permit = permit;
            task.await
        }));

        self.reap_finished().await
    }

    /// Stop accepting and drain everything still in flight
    ///
    /// Waits for **all** outstanding tasks, not just the finished ones,
    /// delivers them as a final batch, then closes the gate. Calling
    /// close again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::SinkFailed`] if the sink rejects the final
    /// batch. The pool is closed either way.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let settled = futures::future::join_all(self.inflight.drain(..)).await;
        let batch: Vec<Result<T>> = settled.into_iter().map(Self::settle).collect();

        let delivered = self.deliver(batch);
        self.gate.close();
        delivered
    }

    /// Number of tracked tasks not yet reaped
    #[must_use]
    pub fn size(&self) -> usize {
        self.inflight.len()
    }

    /// Reap finished tasks without waiting and deliver them as a batch
    async fn reap_finished(&mut self) -> Result<()> {
        let mut batch = Vec::new();
        let mut index = 0;
        while index < self.inflight.len() {
            if self.inflight[index].is_finished() {
                let handle = self.inflight.swap_remove(index);
                batch.push(Self::settle(handle.await));
            } else {
                index += 1;
            }
        }
        self.deliver(batch)
    }

    /// Convert a join outcome into a result entry; panics become errors
    fn settle(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
        joined.unwrap_or_else(|join_error| {
            Err(PoolError::TaskPanicked {
                message: join_error.to_string(),
            }
            .into())
        })
    }

    fn deliver(&mut self, batch: Vec<Result<T>>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        match &mut self.sink {
            Some(sink) => sink(batch).map_err(|error| {
                Error::from(PoolError::SinkFailed {
                    message: error.to_string(),
                })
            }),
            None => {
                debug!(count = batch.len(), "no sink configured; dropping batch");
                Ok(())
            }
        }
    }
}
