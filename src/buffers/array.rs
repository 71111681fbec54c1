//! Pooled array handle
//!
//! A [`PooledArray`] is a reference-counted handle to a fixed-length boxed
//! slice. Clones share the same storage and the same identity, which is what
//! the pool uses to tell its buffers apart. Element access goes through a
//! per-array reader/writer lock, so even a buffer that was double-rented
//! under a permissive return policy is never a data race.

use std::{
    fmt,
    ops::{Deref, DerefMut, Range},
    sync::Arc,
};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{next_buffer_id, BufferId};

struct ArrayStorage<T> {
    id: BufferId,
    len: usize,
    data: RwLock<Box<[T]>>,
}

/// Shared handle to a fixed-length array
pub struct PooledArray<T> {
    storage: Option<Arc<ArrayStorage<T>>>,
}

impl<T> PooledArray<T> {
    /// The zero-length array
    ///
    /// Owns no storage, has no identity, never touches the allocator.
    pub const fn empty() -> Self {
        Self { storage: None }
    }

    /// Allocate a new array of `len` default-valued elements
    pub(crate) fn allocate(len: usize) -> Self
    where
        T: Default,
    {
        let data: Box<[T]> = (0..len).map(|_| T::default()).collect();
        Self::from_boxed(data)
    }

    fn from_boxed(data: Box<[T]>) -> Self {
        if data.is_empty() {
            return Self::empty();
        }
        Self {
            storage: Some(Arc::new(ArrayStorage {
                id: next_buffer_id(),
                len: data.len(),
                data: RwLock::new(data),
            })),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.storage.as_ref().map_or(0, |storage| storage.len)
    }

    /// Whether this is the zero-length array
    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
    }

    /// Identity of the underlying storage, `None` for the empty array
    pub fn id(&self) -> Option<BufferId> {
        self.storage.as_ref().map(|storage| storage.id)
    }

    /// Whether both handles refer to the same storage
    ///
    /// Two empty arrays are considered the same.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Number of live handles sharing this storage
    pub fn handle_count(&self) -> usize {
        self.storage.as_ref().map_or(0, Arc::strong_count)
    }

    /// Lock the array for reading
    ///
    /// The lock is shared with every clone and every slice view of this
    /// array and is not reentrant: taking a write guard while holding any
    /// guard on the same array deadlocks.
    pub fn read(&self) -> ArrayRef<'_, T> {
        ArrayRef {
            guard: self.storage.as_ref().map(|storage| storage.data.read()),
            range: 0..self.len(),
        }
    }

    /// Lock the array for writing
    pub fn write(&self) -> ArrayMut<'_, T> {
        ArrayMut {
            guard: self.storage.as_ref().map(|storage| storage.data.write()),
            range: 0..self.len(),
        }
    }

    /// Overwrite every element with `T::default()`
    pub fn clear(&self)
    where
        T: Default,
    {
        self.write().fill_with(T::default);
    }

    /// Copy the contents into a new vector
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.read().to_vec()
    }

    pub(crate) fn read_range(&self, range: Range<usize>) -> ArrayRef<'_, T> {
        debug_assert!(range.end <= self.len());
        ArrayRef {
            guard: self.storage.as_ref().map(|storage| storage.data.read()),
            range,
        }
    }

    pub(crate) fn write_range(&self, range: Range<usize>) -> ArrayMut<'_, T> {
        debug_assert!(range.end <= self.len());
        ArrayMut {
            guard: self.storage.as_ref().map(|storage| storage.data.write()),
            range,
        }
    }
}

impl<T> Clone for PooledArray<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<T> Default for PooledArray<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for PooledArray<T> {
    /// Wrap caller-owned storage; the result is foreign to every pool
    fn from(data: Vec<T>) -> Self {
        Self::from_boxed(data.into_boxed_slice())
    }
}

impl<T> From<Box<[T]>> for PooledArray<T> {
    fn from(data: Box<[T]>) -> Self {
        Self::from_boxed(data)
    }
}

impl<T> fmt::Debug for PooledArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledArray")
            .field("id", &self.id())
            .field("len", &self.len())
            .finish()
    }
}

/// Read guard over a pooled array or a window of it
pub struct ArrayRef<'a, T> {
    guard: Option<RwLockReadGuard<'a, Box<[T]>>>,
    range: Range<usize>,
}

impl<T> Deref for ArrayRef<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.guard {
            Some(guard) => &guard[self.range.clone()],
            None => Default::default(),
        }
    }
}

/// Write guard over a pooled array or a window of it
pub struct ArrayMut<'a, T> {
    guard: Option<RwLockWriteGuard<'a, Box<[T]>>>,
    range: Range<usize>,
}

impl<T> Deref for ArrayMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.guard {
            Some(guard) => &guard[self.range.clone()],
            None => Default::default(),
        }
    }
}

impl<T> DerefMut for ArrayMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        let range = self.range.clone();
        match &mut self.guard {
            Some(guard) => &mut guard[range],
            None => Default::default(),
        }
    }
}
