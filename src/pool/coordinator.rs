//! Pool coordinator
//!
//! Routes rent and return calls to the bucket for their exact length,
//! creating buckets lazily, and drives maintenance across every bucket.

use std::{fmt, sync::Arc};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    bucket::{Bucket, BucketStats, ReturnDisposition},
    buffers::{check_length, length::size_class, PooledArray, PooledSlice, RequestedLength},
    diagnostics::{DiagnosticSink, LogDiagnostics},
    error::{MisuseKind, Result},
    policy::ReturnPolicy,
};

use super::{
    config::ArrayPoolConfig,
    guard::RentedArray,
    maintenance::{Maintain, MaintenanceHandle},
    stats::{AtomicPoolStats, PoolStats},
};

/// State shared between the pool, its guards and its maintenance thread
pub(crate) struct PoolShared<T> {
    config: ArrayPoolConfig,
    buckets: DashMap<usize, Arc<Bucket<T>>>,
    stats: AtomicPoolStats,
    sink: Arc<dyn DiagnosticSink>,
}

impl<T: Default + Send + Sync + 'static> PoolShared<T> {
    fn new(config: ArrayPoolConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
            stats: AtomicPoolStats::new(),
            sink,
        }
    }

    pub(crate) fn config(&self) -> &ArrayPoolConfig {
        &self.config
    }

    fn bucket(&self, length: usize) -> Option<Arc<Bucket<T>>> {
        self.buckets.get(&length).map(|bucket| bucket.value().clone())
    }

    fn bucket_for(&self, length: usize) -> Result<Arc<Bucket<T>>> {
        if let Some(bucket) = self.bucket(length) {
            return Ok(bucket);
        }

        match self.buckets.entry(length) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let bucket = Arc::new(Bucket::new(length)?);
                entry.insert(bucket.clone());
                log::debug!("pool {}: created bucket for length {}", self.config.name, length);
                Ok(bucket)
            }
        }
    }

    /// Rent from the bucket for `length`; `length` is already validated
    fn rent(&self, length: usize, zero_fill: bool) -> Result<PooledArray<T>> {
        let bucket = self.bucket_for(length)?;
        let (array, source) = bucket.get_buffer();
        self.stats.record_rent(source);
        if zero_fill {
            array.clear();
        }
        Ok(array)
    }

    pub(crate) fn return_array(&self, array: PooledArray<T>, policy: ReturnPolicy) -> Result<()> {
        if array.is_empty() {
            return Ok(());
        }

        let Some(bucket) = self.bucket(array.len()) else {
            return self.return_foreign(array, policy);
        };

        match bucket.return_buffer(array, policy, self) {
            Ok(ReturnDisposition::Stored | ReturnDisposition::Adopted) => {
                self.stats.record_return();
                Ok(())
            }
            Ok(ReturnDisposition::Ignored) => {
                self.stats.record_ignored();
                Ok(())
            }
            Err(err) => {
                self.stats.record_misuse();
                Err(err)
            }
        }
    }

    /// No bucket has ever served this length, so the array cannot be ours
    fn return_foreign(&self, array: PooledArray<T>, policy: ReturnPolicy) -> Result<()> {
        let length = array.len();
        match policy.non_member.apply(MisuseKind::ForeignBuffer, length, self) {
            Ok(true) => {
                self.bucket_for(length)?.adopt(array);
                self.stats.record_return();
                Ok(())
            }
            Ok(false) => {
                self.stats.record_ignored();
                Ok(())
            }
            Err(err) => {
                self.stats.record_misuse();
                Err(err)
            }
        }
    }

    fn return_slice(&self, slice: PooledSlice<T>, policy: ReturnPolicy) -> Result<()> {
        if let Some(array) = slice.into_backing() {
            return self.return_array(array, policy);
        }

        // Detached view: nothing to adopt, so adopting policies drop it
        match policy
            .non_member
            .apply(MisuseKind::UnresolvableSlice, 0, self)
        {
            Ok(_) => {
                self.stats.record_ignored();
                Ok(())
            }
            Err(err) => {
                self.stats.record_misuse();
                Err(err)
            }
        }
    }

    fn buckets(&self) -> Vec<Arc<Bucket<T>>> {
        self.buckets
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn process_pending_work(&self) -> usize {
        let released = self
            .buckets()
            .iter()
            .map(|bucket| bucket.process_pending_work())
            .sum();
        self.stats.record_maintenance(released);
        released
    }

    fn used_bytes(&self) -> usize {
        self.buckets
            .iter()
            .map(|entry| entry.value().used_bytes())
            .fold(0, usize::saturating_add)
    }

    fn available_bytes(&self) -> usize {
        self.buckets
            .iter()
            .map(|entry| entry.value().available_bytes())
            .fold(0, usize::saturating_add)
    }
}

impl<T> DiagnosticSink for PoolShared<T>
where
    T: Send + Sync,
{
    fn report(&self, kind: MisuseKind, length: usize) {
        self.stats.record_diagnostic();
        self.sink.report(kind, length);
    }
}

impl<T: Default + Send + Sync + 'static> Maintain for PoolShared<T> {
    fn run_maintenance(&self) -> usize {
        self.process_pending_work()
    }
}

/// Thread-safe pool of fixed-length arrays
///
/// Buffers are grouped by exact length. A bucket is created the first time
/// a length is rented (or adopted) and lives as long as the pool. Unless
/// the configuration turns it off, a background thread trims idle buffers
/// every `maintenance_interval`; it is stopped and joined when the pool is
/// dropped.
///
/// ```
/// use arraypool::ArrayPool;
///
/// let pool = ArrayPool::<u8>::with_defaults();
/// let buffer = pool.rent_minimum(1000, false).unwrap();
/// assert_eq!(buffer.len(), 1024);
///
/// buffer.write()[0] = 42;
/// pool.return_array(buffer).unwrap();
/// assert_eq!(pool.total_available_bytes(), 1024);
/// ```
pub struct ArrayPool<T: Default + Send + Sync + 'static> {
    shared: Arc<PoolShared<T>>,
    maintenance: Option<MaintenanceHandle>,
}

impl<T: Default + Send + Sync + 'static> ArrayPool<T> {
    /// Create a pool from `config`, reporting misuse through `log`
    pub fn new(config: ArrayPoolConfig) -> Result<Self> {
        Self::with_diagnostic_sink(config, Arc::new(LogDiagnostics))
    }

    /// Create a pool that reports misuse to `sink`
    pub fn with_diagnostic_sink(
        config: ArrayPoolConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(PoolShared::new(config, sink));
        let maintenance = if shared.config.background_maintenance {
            Some(MaintenanceHandle::spawn(
                Arc::downgrade(&shared),
                shared.config.maintenance_interval,
                &shared.config.name,
            )?)
        } else {
            None
        };

        Ok(Self {
            shared,
            maintenance,
        })
    }

    /// Default configuration without a maintenance thread
    ///
    /// Idle buffers are only trimmed by calling
    /// [`process_pending_work`](Self::process_pending_work).
    pub fn with_defaults() -> Self {
        let config = ArrayPoolConfig::default().with_background_maintenance(false);
        Self {
            shared: Arc::new(PoolShared::new(config, Arc::new(LogDiagnostics))),
            maintenance: None,
        }
    }

    /// Rent an array of exactly `len` elements
    ///
    /// A zero length yields the empty array without touching any bucket.
    /// With `zero_fill` every element is reset to `T::default()`; otherwise
    /// a reused array keeps whatever its previous renter left in it.
    pub fn rent_exactly<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Result<PooledArray<T>> {
        let len = check_length::<T>(len.to_length()?)?;
        if len == 0 {
            return Ok(PooledArray::empty());
        }
        self.shared.rent(len, zero_fill)
    }

    /// Rent an array of at least `len` elements, rounded up to a power of two
    pub fn rent_minimum<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Result<PooledArray<T>> {
        let len = len.to_length()?;
        if len == 0 {
            return Ok(PooledArray::empty());
        }
        self.shared.rent(size_class::<T>(len)?, zero_fill)
    }

    /// Rent a view of exactly `len` elements over a power-of-two array
    pub fn rent_slice<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Result<PooledSlice<T>> {
        let len = len.to_length()?;
        if len == 0 {
            return Ok(PooledSlice::empty());
        }
        let array = self.shared.rent(size_class::<T>(len)?, zero_fill)?;
        Ok(PooledSlice::new(array, len))
    }

    /// [`rent_exactly`](Self::rent_exactly) with every failure mapped to `None`
    pub fn try_rent_exactly<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Option<PooledArray<T>> {
        self.rent_exactly(len, zero_fill).ok()
    }

    /// [`rent_minimum`](Self::rent_minimum) with every failure mapped to `None`
    pub fn try_rent_minimum<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Option<PooledArray<T>> {
        self.rent_minimum(len, zero_fill).ok()
    }

    /// [`rent_slice`](Self::rent_slice) with every failure mapped to `None`
    pub fn try_rent_slice<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Option<PooledSlice<T>> {
        self.rent_slice(len, zero_fill).ok()
    }

    /// Rent an array that returns itself when dropped
    pub fn rent_guard<L: RequestedLength>(&self, len: L, zero_fill: bool) -> Result<RentedArray<T>> {
        let array = self.rent_exactly(len, zero_fill)?;
        Ok(RentedArray::new(array, self.shared.clone()))
    }

    /// Return an array under the pool's default policy
    pub fn return_array(&self, array: PooledArray<T>) -> Result<()> {
        self.shared.return_array(array, self.shared.config.return_policy)
    }

    /// Return an array under an explicit policy
    pub fn return_array_with(&self, array: PooledArray<T>, policy: ReturnPolicy) -> Result<()> {
        self.shared.return_array(array, policy)
    }

    /// Return a view's backing array under the pool's default policy
    pub fn return_slice(&self, slice: PooledSlice<T>) -> Result<()> {
        self.shared.return_slice(slice, self.shared.config.return_policy)
    }

    /// Return a view's backing array under an explicit policy
    ///
    /// A zero-length view is a no-op. A detached view is treated as foreign
    /// but never adopted.
    pub fn return_slice_with(&self, slice: PooledSlice<T>, policy: ReturnPolicy) -> Result<()> {
        self.shared.return_slice(slice, policy)
    }

    /// Run one maintenance tick over every bucket
    ///
    /// Returns the number of buffers released.
    pub fn process_pending_work(&self) -> usize {
        self.shared.process_pending_work()
    }

    /// Bytes held by rented buffers across all buckets
    pub fn total_used_bytes(&self) -> usize {
        self.shared.used_bytes()
    }

    /// Bytes held by available buffers across all buckets
    pub fn total_available_bytes(&self) -> usize {
        self.shared.available_bytes()
    }

    /// Used plus available bytes
    pub fn total_allocated_bytes(&self) -> usize {
        self.total_used_bytes()
            .saturating_add(self.total_available_bytes())
    }

    /// Number of length classes seen so far
    pub fn bucket_count(&self) -> usize {
        self.shared.buckets.len()
    }

    /// Per-length counters, sorted by length
    pub fn bucket_stats(&self) -> Vec<BucketStats> {
        let mut stats: Vec<_> = self
            .shared
            .buckets()
            .iter()
            .map(|bucket| bucket.stats())
            .collect();
        stats.sort_by_key(|stats| stats.length);
        stats
    }

    /// Snapshot of the pool counters and byte totals
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            buckets: self.bucket_count(),
            used_bytes: self.total_used_bytes(),
            available_bytes: self.total_available_bytes(),
            ..self.shared.stats.snapshot()
        }
    }

    /// Configuration the pool was created with
    pub fn config(&self) -> &ArrayPoolConfig {
        self.shared.config()
    }

    /// Whether the background maintenance thread is alive
    pub fn is_maintenance_running(&self) -> bool {
        self.maintenance
            .as_ref()
            .map_or(false, MaintenanceHandle::is_running)
    }
}

impl<T: Default + Send + Sync + 'static> Default for ArrayPool<T> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<T: Default + Send + Sync + 'static> fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool")
            .field("name", &self.shared.config.name)
            .field("buckets", &self.bucket_count())
            .field("maintenance", &self.is_maintenance_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::tests::RecordingSink,
        error::PoolError,
        policy::{AlreadyReturnedPolicy, NonMemberPolicy},
    };
    use std::time::Duration;

    fn manual(name: &str) -> ArrayPoolConfig {
        ArrayPoolConfig::new(name).with_background_maintenance(false)
    }

    #[test]
    fn test_zero_length_touches_nothing() {
        let pool = ArrayPool::<u32>::with_defaults();
        assert!(pool.rent_exactly(0, true).unwrap().is_empty());
        assert!(pool.rent_minimum(0u8, false).unwrap().is_empty());
        assert!(pool.rent_slice(0i64, false).unwrap().is_empty());
        assert_eq!(pool.bucket_count(), 0);
        assert_eq!(pool.stats().rents, 0);

        pool.return_array(PooledArray::empty()).unwrap();
        assert_eq!(pool.bucket_count(), 0);
    }

    #[test]
    fn test_zero_length_view_returns_quietly() {
        let sink = Arc::new(RecordingSink::default());
        let pool = ArrayPool::<u8>::with_diagnostic_sink(manual("zero"), sink.clone()).unwrap();

        let view = pool.rent_slice(0, false).unwrap();
        pool.return_slice_with(view, ReturnPolicy::strict()).unwrap();
        let view = pool.rent_slice(0, true).unwrap();
        pool.return_slice_with(view, ReturnPolicy::diagnostic()).unwrap();

        assert!(sink.reports().is_empty());
        let stats = pool.stats();
        assert_eq!(stats.ignored_returns, 0);
        assert_eq!(stats.misuse_failures, 0);
        assert_eq!(pool.bucket_count(), 0);
    }

    #[test]
    fn test_rent_routes_by_length() {
        let pool = ArrayPool::<u16>::with_defaults();
        let exact = pool.rent_exactly(100, false).unwrap();
        let rounded = pool.rent_minimum(100, false).unwrap();
        assert_eq!(exact.len(), 100);
        assert_eq!(rounded.len(), 128);
        assert_eq!(pool.bucket_count(), 2);

        let lengths: Vec<_> = pool.bucket_stats().iter().map(|s| s.length).collect();
        assert_eq!(lengths, vec![100, 128]);
        assert_eq!(pool.total_used_bytes(), (100 + 128) * 2);
    }

    #[test]
    fn test_zero_fill_clears_reused_contents() {
        let pool = ArrayPool::<u8>::with_defaults();
        let array = pool.rent_exactly(16, false).unwrap();
        array.write().fill(0xAB);
        pool.return_array(array).unwrap();

        let dirty = pool.rent_exactly(16, false).unwrap();
        assert!(dirty.read().iter().all(|&b| b == 0xAB));
        pool.return_array(dirty).unwrap();

        let clean = pool.rent_exactly(16, true).unwrap();
        assert!(clean.read().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_foreign_return_without_bucket() {
        let sink = Arc::new(RecordingSink::default());
        let pool = ArrayPool::<u8>::with_diagnostic_sink(manual("foreign"), sink.clone()).unwrap();

        pool.return_array(PooledArray::from(vec![1u8; 12])).unwrap();
        assert_eq!(pool.bucket_count(), 0);
        assert_eq!(pool.stats().ignored_returns, 1);

        let err = pool
            .return_array_with(PooledArray::from(vec![1u8; 12]), ReturnPolicy::strict())
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::Misuse {
                kind: MisuseKind::ForeignBuffer,
                length: 12
            }
        ));

        let policy = ReturnPolicy::default().with_non_member(NonMemberPolicy::AdoptWithDiagnostic);
        pool.return_array_with(PooledArray::from(vec![1u8; 12]), policy)
            .unwrap();
        assert_eq!(pool.bucket_count(), 1);
        assert_eq!(pool.total_available_bytes(), 12);
        assert_eq!(sink.reports(), vec![(MisuseKind::ForeignBuffer, 12)]);

        let stats = pool.stats();
        assert_eq!(stats.diagnostics, 1);
        assert_eq!(stats.misuse_failures, 1);
    }

    #[test]
    fn test_unresolvable_slice_is_never_adopted() {
        let sink = Arc::new(RecordingSink::default());
        let pool = ArrayPool::<u8>::with_diagnostic_sink(manual("slices"), sink.clone()).unwrap();

        let adopt = ReturnPolicy::default().with_non_member(NonMemberPolicy::AdoptWithDiagnostic);
        pool.return_slice_with(PooledSlice::detached(), adopt).unwrap();
        assert_eq!(pool.bucket_count(), 0);
        assert_eq!(sink.reports(), vec![(MisuseKind::UnresolvableSlice, 0)]);

        let err = pool
            .return_slice_with(PooledSlice::detached(), ReturnPolicy::strict())
            .unwrap_err();
        assert_eq!(err.misuse_kind(), Some(MisuseKind::UnresolvableSlice));
    }

    #[test]
    fn test_config_policy_is_the_default() {
        let config = manual("strict").with_return_policy(ReturnPolicy::new(
            NonMemberPolicy::Ignore,
            AlreadyReturnedPolicy::FailLoudly,
        ));
        let pool = ArrayPool::<u8>::new(config).unwrap();

        let array = pool.rent_exactly(8, false).unwrap();
        pool.return_array(array.clone()).unwrap();
        assert!(pool.return_array(array).is_err());
    }

    #[test]
    fn test_background_maintenance_lifecycle() {
        let config = ArrayPoolConfig::new("background")
            .with_maintenance_interval(Duration::from_millis(5));
        let pool = ArrayPool::<u8>::new(config).unwrap();
        assert!(pool.is_maintenance_running());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while pool.stats().maintenance_ticks == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(pool.stats().maintenance_ticks > 0);
        drop(pool);

        assert!(!ArrayPool::<u8>::with_defaults().is_maintenance_running());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ArrayPoolConfig::new("bad").with_maintenance_interval(Duration::ZERO);
        assert!(ArrayPool::<u8>::new(config).is_err());
    }
}
