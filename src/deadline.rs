//! Cooperative request deadlines
//!
//! Analyzers check a [`Deadline`] between group iterations and give up with an
//! empty outcome once it has passed. Nothing is preempted.

use std::time::{Duration, Instant};

/// Soft time limit for one analytics request
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires
    pub fn none() -> Self {
        Self { at: None }
    }

    /// A deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Build from an optional millisecond budget
    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => Self::after(Duration::from_millis(ms)),
            None => Self::none(),
        }
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Reason string for an analysis aborted by its deadline
pub(crate) fn deadline_reason(stage: &str, processed: usize, total: usize) -> String {
    format!(
        "deadline exceeded during {} after {} of {} groups",
        stage, processed, total
    )
}
