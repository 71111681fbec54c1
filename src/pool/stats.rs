//! Array pool statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::bucket::RentSource;

/// Statistics for array pool monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of length classes the pool has seen
    pub buckets: usize,
    /// Bytes held by rented buffers
    pub used_bytes: usize,
    /// Bytes held by available buffers
    pub available_bytes: usize,
    /// Successful rents of a non-empty array
    pub rents: u64,
    /// Rents served from the available set
    pub reuses: u64,
    /// Rents that had to allocate
    pub allocations: u64,
    /// Returns that left the buffer available
    pub returns: u64,
    /// Returns that dropped the buffer under an ignore policy
    pub ignored_returns: u64,
    /// Returns rejected with a misuse error
    pub misuse_failures: u64,
    /// Diagnostic notices raised
    pub diagnostics: u64,
    /// Buffers released by trimming
    pub trimmed: u64,
    /// Maintenance ticks run
    pub maintenance_ticks: u64,
}

impl PoolStats {
    /// Total bytes owned through the pool
    pub fn allocated_bytes(&self) -> usize {
        self.used_bytes.saturating_add(self.available_bytes)
    }

    /// Fraction of rents served without allocating (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.rents == 0 {
            return 0.0;
        }
        self.reuses as f64 / self.rents as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "PoolStats {{ buckets: {}, used: {}B, available: {}B, rents: {}, \
             hit_rate: {:.2}%, returns: {}, ignored: {}, misuse: {}, trimmed: {} }}",
            self.buckets,
            self.used_bytes,
            self.available_bytes,
            self.rents,
            self.hit_rate() * 100.0,
            self.returns,
            self.ignored_returns,
            self.misuse_failures,
            self.trimmed
        )
    }
}

/// Thread-safe counters for array pools
#[derive(Debug, Default)]
pub struct AtomicPoolStats {
    rents: AtomicU64,
    reuses: AtomicU64,
    allocations: AtomicU64,
    returns: AtomicU64,
    ignored_returns: AtomicU64,
    misuse_failures: AtomicU64,
    diagnostics: AtomicU64,
    trimmed: AtomicU64,
    maintenance_ticks: AtomicU64,
}

impl AtomicPoolStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful rent
    pub fn record_rent(&self, source: RentSource) {
        self.rents.fetch_add(1, Ordering::Relaxed);
        match source {
            RentSource::Reused => self.reuses.fetch_add(1, Ordering::Relaxed),
            RentSource::Allocated => self.allocations.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record a return that kept the buffer
    pub fn record_return(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a return that dropped the buffer
    pub fn record_ignored(&self) {
        self.ignored_returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected return
    pub fn record_misuse(&self) {
        self.misuse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a diagnostic notice
    pub fn record_diagnostic(&self) {
        self.diagnostics.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one maintenance tick and what it released
    pub fn record_maintenance(&self, released: usize) {
        self.maintenance_ticks.fetch_add(1, Ordering::Relaxed);
        self.trimmed.fetch_add(released as u64, Ordering::Relaxed);
    }

    /// Get current counters; byte totals and bucket count are left at zero
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            rents: self.rents.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            ignored_returns: self.ignored_returns.load(Ordering::Relaxed),
            misuse_failures: self.misuse_failures.load(Ordering::Relaxed),
            diagnostics: self.diagnostics.load(Ordering::Relaxed),
            trimmed: self.trimmed.load(Ordering::Relaxed),
            maintenance_ticks: self.maintenance_ticks.load(Ordering::Relaxed),
            ..PoolStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = AtomicPoolStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);

        stats.record_rent(RentSource::Allocated);
        stats.record_rent(RentSource::Reused);
        stats.record_rent(RentSource::Reused);
        stats.record_rent(RentSource::Reused);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rents, 4);
        assert_eq!(snapshot.allocations, 1);
        assert!((snapshot.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counters_and_summary() {
        let stats = AtomicPoolStats::new();
        stats.record_return();
        stats.record_ignored();
        stats.record_misuse();
        stats.record_diagnostic();
        stats.record_maintenance(5);
        stats.record_maintenance(2);

        let mut snapshot = stats.snapshot();
        assert_eq!(snapshot.returns, 1);
        assert_eq!(snapshot.ignored_returns, 1);
        assert_eq!(snapshot.misuse_failures, 1);
        assert_eq!(snapshot.diagnostics, 1);
        assert_eq!(snapshot.trimmed, 7);
        assert_eq!(snapshot.maintenance_ticks, 2);

        snapshot.used_bytes = 100;
        snapshot.available_bytes = 28;
        assert_eq!(snapshot.allocated_bytes(), 128);
        assert!(snapshot.summary().contains("trimmed: 7"));
    }
}
