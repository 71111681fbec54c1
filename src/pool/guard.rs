//! Scoped rentals

use std::{fmt, ops::Deref, sync::Arc};

use crate::buffers::PooledArray;

use super::coordinator::PoolShared;

/// An array that goes back to its pool when dropped
///
/// The return uses the pool's default policy. A failed return is logged,
/// since `Drop` has nowhere to report it.
pub struct RentedArray<T: Default + Send + Sync + 'static> {
    array: PooledArray<T>,
    pool: Arc<PoolShared<T>>,
}

impl<T: Default + Send + Sync + 'static> RentedArray<T> {
    pub(crate) fn new(array: PooledArray<T>, pool: Arc<PoolShared<T>>) -> Self {
        Self { array, pool }
    }

    /// Keep the array; it will not be returned automatically
    pub fn detach(mut self) -> PooledArray<T> {
        std::mem::take(&mut self.array)
    }
}

impl<T: Default + Send + Sync + 'static> Deref for RentedArray<T> {
    type Target = PooledArray<T>;

    fn deref(&self) -> &PooledArray<T> {
        &self.array
    }
}

impl<T: Default + Send + Sync + 'static> Drop for RentedArray<T> {
    fn drop(&mut self) {
        let array = std::mem::take(&mut self.array);
        if array.is_empty() {
            return;
        }

        let length = array.len();
        let policy = self.pool.config().return_policy;
        if let Err(err) = self.pool.return_array(array, policy) {
            log::warn!("failed to return rented array of length {}: {}", length, err);
        }
    }
}

impl<T: Default + Send + Sync + 'static> fmt::Debug for RentedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RentedArray")
            .field("array", &self.array)
            .finish()
    }
}
