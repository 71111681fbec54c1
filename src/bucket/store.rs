//! Bucket store for one exact array length

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::{
    buffers::PooledArray,
    diagnostics::DiagnosticSink,
    error::{MisuseKind, PoolError, Result},
    policy::{AlreadyReturnedPolicy, ReturnPolicy},
    sync::ConcurrentBag,
};

use super::history::UsageHistory;

/// Where a rented buffer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentSource {
    /// Taken from the available set
    Reused,
    /// Freshly allocated
    Allocated,
}

/// What happened to a returned buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDisposition {
    /// It was rented from this bucket and is available again
    Stored,
    /// It was foreign and has been adopted into the available set
    Adopted,
    /// It was dropped without being made available
    Ignored,
}

/// Point-in-time view of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    /// Element count of every buffer in the bucket
    pub length: usize,
    /// Buffers currently lent out
    pub rented: usize,
    /// Buffers ready for reuse
    pub available: usize,
    /// Peak rented count in the current maintenance interval
    pub current_peak: usize,
    /// Bytes held by rented buffers
    pub used_bytes: usize,
    /// Bytes held by available buffers
    pub available_bytes: usize,
}

/// All buffers of one exact length
///
/// `rented` tracks identities only; the caller owns the handle while the
/// buffer is out. `available` owns the handles it holds.
#[derive(Debug)]
pub struct Bucket<T> {
    length: usize,
    rented: ConcurrentBag<()>,
    available: ConcurrentBag<PooledArray<T>>,
    history: UsageHistory,
    trimming: AtomicBool,
}

impl<T> Bucket<T> {
    /// Create an empty bucket for arrays of `length` elements
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(PoolError::invalid_parameter(
                "length",
                "Bucket length cannot be zero",
            ));
        }

        Ok(Self {
            length,
            rented: ConcurrentBag::new(),
            available: ConcurrentBag::new(),
            history: UsageHistory::new(),
            trimming: AtomicBool::new(false),
        })
    }

    /// Element count served by this bucket
    pub fn length(&self) -> usize {
        self.length
    }

    /// Buffers currently lent out
    pub fn rented_count(&self) -> usize {
        self.rented.len()
    }

    /// Buffers ready for reuse
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Rolling usage window
    pub fn history(&self) -> &UsageHistory {
        &self.history
    }

    /// Rent a buffer, reusing an available one when possible
    pub fn get_buffer(&self) -> (PooledArray<T>, RentSource)
    where
        T: Default,
    {
        let (array, source) = match self.available.pop() {
            Some((_, array)) => (array, RentSource::Reused),
            None => (PooledArray::allocate(self.length), RentSource::Allocated),
        };

        if let Some(id) = array.id() {
            self.rented.push(id, ());
        }
        self.history.record(self.rented.len());

        (array, source)
    }

    /// Take a buffer back under `policy`
    ///
    /// Both checks are linear scans of the respective set.
    pub fn return_buffer(
        &self,
        array: PooledArray<T>,
        policy: ReturnPolicy,
        sink: &dyn DiagnosticSink,
    ) -> Result<ReturnDisposition> {
        debug_assert_eq!(array.len(), self.length, "returned to the wrong bucket");
        let Some(id) = array.id() else {
            return Ok(ReturnDisposition::Ignored);
        };

        if policy.already_returned.checks() && self.available.contains(id) {
            match policy.already_returned {
                AlreadyReturnedPolicy::FailLoudly => {
                    return Err(PoolError::misuse(MisuseKind::AlreadyReturned, self.length));
                }
                AlreadyReturnedPolicy::DiagnosticOnly => {
                    sink.report(MisuseKind::AlreadyReturned, self.length);
                }
                AlreadyReturnedPolicy::Ignore => {}
            }
        }

        let member = self.rented.remove(id).is_some();
        if !member
            && !policy
                .non_member
                .apply(MisuseKind::ForeignBuffer, self.length, sink)?
        {
            return Ok(ReturnDisposition::Ignored);
        }

        self.available.push(id, array);
        Ok(if member {
            ReturnDisposition::Stored
        } else {
            ReturnDisposition::Adopted
        })
    }

    /// Put a buffer straight into the available set, skipping every check
    pub(crate) fn adopt(&self, array: PooledArray<T>) {
        if let Some(id) = array.id() {
            self.available.push(id, array);
        }
    }

    /// One maintenance tick: release idle buffers above the retention target
    ///
    /// Returns the number of buffers released. A call that overlaps another
    /// tick on the same bucket does nothing and returns 0.
    pub fn process_pending_work(&self) -> usize {
        if self
            .trimming
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }

        let target = self.history.retention_target();
        let mut released = 0;
        while (self.rented.len() + self.available.len()) as f64 > target {
            // Rented buffers are never reclaimed
            if self.available.pop().is_none() {
                break;
            }
            released += 1;
        }
        self.history.advance();

        log::trace!(
            "bucket {}: target {:.1}, released {}, retained {}",
            self.length,
            target,
            released,
            self.available.len()
        );

        self.trimming.store(false, Ordering::Release);
        released
    }

    /// Bytes held by rented buffers
    pub fn used_bytes(&self) -> usize {
        self.bytes_for(self.rented.len())
    }

    /// Bytes held by available buffers
    pub fn available_bytes(&self) -> usize {
        self.bytes_for(self.available.len())
    }

    /// Snapshot of this bucket's counters
    pub fn stats(&self) -> BucketStats {
        let rented = self.rented.len();
        let available = self.available.len();
        BucketStats {
            length: self.length,
            rented,
            available,
            current_peak: self.history.current_peak(),
            used_bytes: self.bytes_for(rented),
            available_bytes: self.bytes_for(available),
        }
    }

    fn bytes_for(&self, count: usize) -> usize {
        std::mem::size_of::<T>()
            .saturating_mul(self.length)
            .saturating_mul(count)
    }
}
