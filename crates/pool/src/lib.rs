#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Admission-gated task pools for the bulkhead toolkit
//!
//! Three submission disciplines over the same permit-based admission
//! control:
//!
//! - [`BoundedTaskPool`]: fire-and-forget submission with an error hook
//! - [`ResultPool`]: gated submission with batched result collection
//! - [`WorkerQueue`]: fixed workers fed through a rendezvous handoff

pub mod result_pool;
pub mod task_pool;
pub mod worker_queue;

pub use result_pool::{BatchSink, ResultPool};
pub use task_pool::{BoundedTaskPool, TaskErrorHook};
pub use worker_queue::{Consume, WorkerQueue};
