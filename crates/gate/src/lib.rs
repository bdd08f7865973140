#![deny(clippy::pedantic, unsafe_code)]

//! Admission control for the bulkhead toolkit
//!
//! This crate provides the [`AdmissionGate`], a resizable counting permit
//! pool with scoped acquire/release, plus the limits configuration and
//! permit-pool helpers shared by the task pools built on top of it.

pub mod gate;
pub mod limits;
pub mod semaphore;

pub use gate::{AdmissionGate, Permit};
pub use limits::GateLimits;
pub use semaphore::{acquire_permit, create_permit_pool, try_acquire_permit};
