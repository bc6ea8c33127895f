//! Request supersession.
//!
//! When a client changes settings while an earlier request is still
//! running, only the newest request's result should be shown. Each
//! request takes a [`Generation`] from a [`RequestTracker`]; when it
//! finishes, the tracker says whether a newer request has started since.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonically increasing request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

/// Hands out generations and tracks the newest one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    /// A tracker that has not issued any generation yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Start a new request, superseding every earlier one.
    pub fn begin(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued generation, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Generation> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            n => Some(Generation(n)),
        }
    }

    /// Whether `generation` is still the newest request.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::Acquire) == generation.0
    }

    /// Keep `value` only if its request has not been superseded.
    pub fn finish<T>(&self, generation: Generation, value: T) -> Option<T> {
        if self.is_current(generation) {
            Some(value)
        } else {
            tracing::debug!(
                generation = generation.0,
                latest = self.latest.load(Ordering::Acquire),
                "discarding stale result"
            );
            None
        }
    }
}
