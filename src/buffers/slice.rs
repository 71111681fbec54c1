//! Length-bounded views over pooled arrays

use std::{
    fmt,
    ops::{Bound, Range, RangeBounds},
};

use crate::error::{PoolError, Result};

use super::array::{ArrayMut, ArrayRef, PooledArray};

/// A window of `len` elements starting at `offset` in a backing array
///
/// The view keeps a handle to its backing array, so returning a slice to
/// the pool returns the whole array. A [`detached`](Self::detached) view
/// has no backing to recover and is treated as foreign on return.
///
/// Every view of one backing array shares that array's lock. Locking two
/// views of the same array at once from one thread deadlocks; use
/// [`with_write`](Self::with_write) or [`copy_from`](Self::copy_from) to
/// work on several windows under a single guard.
pub struct PooledSlice<T> {
    array: PooledArray<T>,
    offset: usize,
    len: usize,
    detached: bool,
}

impl<T> PooledSlice<T> {
    /// The zero-length view, backed by the empty array
    ///
    /// Returning it to a pool is a no-op, like returning the empty array.
    pub const fn empty() -> Self {
        Self {
            array: PooledArray::empty(),
            offset: 0,
            len: 0,
            detached: false,
        }
    }

    /// A zero-length view whose backing array is unknown
    ///
    /// Stands in for a view that lost track of its storage. Pools treat it
    /// as foreign under the caller's `NonMemberPolicy` and never adopt it.
    pub const fn detached() -> Self {
        Self {
            array: PooledArray::empty(),
            offset: 0,
            len: 0,
            detached: true,
        }
    }

    /// View the first `len` elements of `array`
    pub(crate) fn new(array: PooledArray<T>, len: usize) -> Self {
        debug_assert!(len <= array.len());
        Self {
            array,
            offset: 0,
            len,
            detached: false,
        }
    }

    /// Number of elements visible through the view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view shows no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the view within the backing array
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Backing array handle
    pub fn backing(&self) -> &PooledArray<T> {
        &self.array
    }

    /// Whether the backing array can be recovered
    pub fn is_resolvable(&self) -> bool {
        !self.detached
    }

    /// Give up the view and take its backing array, if there is one
    pub fn into_backing(self) -> Option<PooledArray<T>> {
        if self.is_resolvable() {
            Some(self.array)
        } else {
            None
        }
    }

    /// Narrow the view; `range` is relative to this view
    ///
    /// Returns `None` if the range falls outside the view.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Option<Self> {
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.checked_add(1)?,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.checked_add(1)?,
            Bound::Excluded(&end) => end,
            Bound::Unbounded => self.len,
        };
        if start > end || end > self.len {
            return None;
        }
        Some(Self {
            array: self.array.clone(),
            offset: self.offset + start,
            len: end - start,
            detached: self.detached,
        })
    }

    /// Lock the visible elements for reading
    ///
    /// Takes the backing array's lock, which is not reentrant. Do not hold
    /// the guard while locking another view of the same array.
    pub fn read(&self) -> ArrayRef<'_, T> {
        self.array.read_range(self.range())
    }

    /// Lock the visible elements for writing
    ///
    /// Takes the backing array's lock exclusively. Do not hold the guard
    /// while locking another view of the same array.
    pub fn write(&self) -> ArrayMut<'_, T> {
        self.array.write_range(self.range())
    }

    /// Run `f` on the visible elements under a single write guard
    ///
    /// Disjoint windows can then be reached with `split_at_mut` and the
    /// like without taking the lock twice.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let mut guard = self.write();
        f(&mut guard[..])
    }

    /// Overwrite this view with the contents of `source`
    ///
    /// `source` may be a window of the same backing array, overlapping or
    /// not; the array is then locked once. Fails if the lengths differ.
    pub fn copy_from(&self, source: &PooledSlice<T>) -> Result<()>
    where
        T: Clone,
    {
        if source.len != self.len {
            return Err(PoolError::invalid_parameter(
                "source",
                format!("length {} does not match view length {}", source.len, self.len),
            ));
        }

        if !self.array.ptr_eq(&source.array) {
            self.write().clone_from_slice(&source.read());
            return Ok(());
        }

        let mut whole = self.array.write();
        let (dst, src) = (self.range(), source.range());
        if dst == src {
            return Ok(());
        }
        if dst.end <= src.start || src.end <= dst.start {
            if dst.start < src.start {
                let (head, tail) = whole.split_at_mut(src.start);
                head[dst].clone_from_slice(&tail[..self.len]);
            } else {
                let (head, tail) = whole.split_at_mut(dst.start);
                tail[..self.len].clone_from_slice(&head[src]);
            }
        } else {
            let staged = whole[src].to_vec();
            whole[dst].clone_from_slice(&staged);
        }
        Ok(())
    }

    /// Copy the visible elements into a new vector
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.read().to_vec()
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

impl<T> Clone for PooledSlice<T> {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            offset: self.offset,
            len: self.len,
            detached: self.detached,
        }
    }
}

impl<T> Default for PooledSlice<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<PooledArray<T>> for PooledSlice<T> {
    fn from(array: PooledArray<T>) -> Self {
        let len = array.len();
        Self::new(array, len)
    }
}

impl<T> fmt::Debug for PooledSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSlice")
            .field("backing", &self.array)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("detached", &self.detached)
            .finish()
    }
}
