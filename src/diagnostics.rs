use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::interval::IntervalSet;

/// Running count of logical oracle consultations
///
/// Cloned handles share the same count, so a caller can keep one to read the
/// attack's cost after the attack itself has been consumed or has failed
#[derive(Clone, Debug, Default)]
pub struct QueryCounter(Arc<AtomicU64>);

impl QueryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query, returning the updated count
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Compact view of an interval set for trace output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalSummary {
    pub count: usize,
    pub size_bits: u64,
}

impl From<&IntervalSet> for IntervalSummary {
    fn from(set: &IntervalSet) -> Self {
        Self {
            count: set.len(),
            size_bits: set.size().bits(),
        }
    }
}

impl fmt::Display for IntervalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} interval(s), ~2^{} candidates", self.count, self.size_bits)
    }
}
