#![deny(clippy::pedantic, unsafe_code)]

//! Periodic scheduling for the bulkhead toolkit
//!
//! Provides [`PeriodicTask`], a self-rescheduling periodic runner on a
//! dedicated tokio task, with drift-free sleep and a shutdown signal
//! that wakes the sleeper early.

pub mod periodic;

pub use periodic::PeriodicTask;
