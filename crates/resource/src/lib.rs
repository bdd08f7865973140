#![deny(clippy::pedantic, unsafe_code)]

//! Reference-counted closeable resources for the bulkhead toolkit
//!
//! Provides [`RefCounted`], which tracks the number of active owners of
//! a shared [`Closeable`] resource and closes it exactly once when the
//! last owner releases.

pub mod shared;

pub use shared::{Closeable, RefCounted};
