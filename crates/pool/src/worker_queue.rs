//! Fixed-worker queue fed through a rendezvous handoff

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bulkhead_errors::{AdmissionError, PoolError, Result};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A long-lived consumer of queue items
///
/// Each worker loop owns one consumer instance for its whole lifetime.
/// A consumer error is logged and the loop moves on to the next item.
#[async_trait]
pub trait Consume<T>: Send {
    async fn consume(&mut self, item: T) -> Result<()>;
}

/// One item travelling through the handoff, paired with the ack its
/// taking worker fires. tokio has no zero-capacity channel, so the ack
/// is what restores rendezvous semantics: `accept` only returns once a
/// worker actually holds the item.
struct Handoff<T> {
    item: T,
    taken: oneshot::Sender<()>,
}

/// A fixed set of long-lived workers consuming from a rendezvous handoff
///
/// Construction spawns `workers` loops, each built once around a fresh
/// consumer from the factory, all blocking on a single handoff slot.
/// Nothing is buffered: [`accept`](WorkerQueue::accept) parks the
/// producer until some worker is ready to take the item — pure
/// backpressure.
///
/// [`close`](WorkerQueue::close) aborts the worker loops. An item mid
/// handoff and any parked producers are not drained; in-flight loss on
/// shutdown is accepted behavior, not a defect.
pub struct WorkerQueue<T> {
    handoff: mpsc::Sender<Handoff<T>>,
    workers: Vec<JoinHandle<()>>,
    closed: AtomicBool,
}

impl<T: Send + 'static> WorkerQueue<T> {
    /// Spawn `workers` consumer loops
    ///
    /// The factory is called once per worker with the worker index.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new<C, F>(workers: usize, mut make_consumer: F) -> Self
    where
        C: Consume<T> + 'static,
        F: FnMut(usize) -> C,
    {
        let (handoff, receiver) = mpsc::channel::<Handoff<T>>(1);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let mut consumer = make_consumer(worker);
                tokio::spawn(async move {
                    loop {
                        let next = { receiver.lock().await.recv().await };
                        let Some(Handoff { item, taken }) = next else {
                            break;
                        };
                        // unblock the producer before doing the work
                        let _ = taken.send(());
                        if let Err(error) = consumer.consume(item).await {
                            warn!(worker, %error, "consumer failed; continuing");
                        }
                    }
                    debug!(worker, "worker loop exited");
                })
            })
            .collect();

        Self {
            handoff,
            workers,
            closed: AtomicBool::new(false),
        }
    }

    /// Hand an item to a worker, waiting until one takes it
    ///
    /// Returns once exactly one worker holds the item; the item is
    /// never buffered inside the queue.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the queue was closed before
    /// this call, or [`AdmissionError::Cancelled`] if it closes while
    /// the handoff is pending (the item is lost in that case).
    pub async fn accept(&self, item: T) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed.into());
        }

        let (taken_tx, taken_rx) = oneshot::channel();
        self.handoff
            .send(Handoff {
                item,
                taken: taken_tx,
            })
            .await
            .map_err(|_| PoolError::Closed)?;

        taken_rx.await.map_err(|_| AdmissionError::Cancelled {
            operation: "worker handoff".to_string(),
        })?;
        Ok(())
    }

    /// Interrupt all worker loops
    ///
    /// Workers are aborted wherever they are, including mid-consume.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in &self.workers {
            worker.abort();
        }
    }

    /// Whether the queue has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of worker loops
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl<T> Drop for WorkerQueue<T> {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}
