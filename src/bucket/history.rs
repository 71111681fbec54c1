//! Rolling high-water-mark window
//!
//! Each bin holds the peak number of simultaneously rented buffers seen
//! during one maintenance interval. Renters only ever raise a bin, and a
//! larger concurrent peak is never overwritten by a smaller one.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::defaults::{HEADROOM_FACTOR, HISTORY_BINS};

/// Circular array of per-interval usage peaks
#[derive(Debug)]
pub struct UsageHistory {
    bins: [AtomicUsize; HISTORY_BINS],
    current: AtomicUsize,
    initialized: AtomicUsize,
}

impl UsageHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| AtomicUsize::new(0)),
            current: AtomicUsize::new(0),
            initialized: AtomicUsize::new(0),
        }
    }

    /// Raise the current bin to `observed` if it is the larger value
    pub fn record(&self, observed: usize) {
        let bin = &self.bins[self.current.load(Ordering::Acquire)];
        let mut peak = bin.load(Ordering::Relaxed);
        while observed > peak {
            match bin.compare_exchange_weak(peak, observed, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                // Someone else moved the bin; retry only while we still win
                Err(actual) => peak = actual,
            }
        }
    }

    /// Peak recorded in the current interval so far
    pub fn current_peak(&self) -> usize {
        self.bins[self.current.load(Ordering::Acquire)].load(Ordering::Acquire)
    }

    /// Index of the bin renters currently write to
    pub fn current_bin(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Number of bins that have been part of at least one interval
    pub fn initialized_bins(&self) -> usize {
        self.initialized.load(Ordering::Acquire)
    }

    /// Mean peak over the initialized bins, plus headroom
    ///
    /// Also widens the initialized range to cover the current bin. Must
    /// only be called from the serialized maintenance path.
    pub fn retention_target(&self) -> f64 {
        let current = self.current.load(Ordering::Acquire);
        let initialized = (current + 1).max(self.initialized.load(Ordering::Acquire));
        self.initialized.store(initialized, Ordering::Release);

        let total: usize = self.bins[..initialized]
            .iter()
            .map(|bin| bin.load(Ordering::Acquire))
            .sum();
        let mean = total as f64 / initialized as f64;
        mean * HEADROOM_FACTOR
    }

    /// Move to the next bin and clear it
    ///
    /// Must only be called from the serialized maintenance path.
    pub fn advance(&self) {
        let next = (self.current.load(Ordering::Acquire) + 1) % HISTORY_BINS;
        // Clear before publishing so renters never write into a stale peak
        self.bins[next].store(0, Ordering::Release);
        self.current.store(next, Ordering::Release);
    }
}

impl Default for UsageHistory {
    fn default() -> Self {
        Self::new()
    }
}
