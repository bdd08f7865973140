//! Admission limit configuration
//!
//! This module defines the capacity and fairness configuration used when
//! constructing gates and the pools built on them.

use serde::{Deserialize, Serialize};

/// Admission limit configuration
///
/// `capacity` bounds the number of simultaneous permit holders
/// (`None` = unbounded). `fair` selects FIFO ordering among waiters;
/// an unfair gate lets new arrivals barge past parked waiters when a
/// permit happens to be free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateLimits {
    /// Maximum number of simultaneous permit holders (None = unbounded)
    pub capacity: Option<usize>,
    /// Whether waiters are granted permits in FIFO order
    pub fair: bool,
}

impl GateLimits {
    /// Create limits with a fixed capacity
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            fair: false,
        }
    }

    /// Create unbounded limits (acquisition never waits)
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            capacity: None,
            fair: false,
        }
    }

    /// Create limits for testing (small, fair, deterministic ordering)
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            capacity: Some(2),
            fair: true,
        }
    }

    /// Create limits based on system capabilities
    #[must_use]
    pub fn from_system() -> Self {
        let cpu_count = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(4);

        Self {
            capacity: Some(cpu_count),
            fair: false,
        }
    }
}

impl Default for GateLimits {
    fn default() -> Self {
        Self::from_system()
    }
}
