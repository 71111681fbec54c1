//! Requested-length validation and size-class rounding

use crate::{
    defaults::MAX_ZERO_SIZED_LENGTH,
    error::{PoolError, Result},
};

/// Integer types accepted as a requested array length
///
/// Signed types let callers pass negative lengths, which are rejected with
/// [`PoolError::OutOfRange`] instead of being unrepresentable.
pub trait RequestedLength: Copy {
    /// Convert to an element count
    fn to_length(self) -> Result<usize>;
}

macro_rules! impl_signed_length {
    ($($ty:ty),*) => {$(
        impl RequestedLength for $ty {
            #[inline]
            fn to_length(self) -> Result<usize> {
                if self < 0 {
                    return Err(PoolError::out_of_range(self as i128));
                }
                usize::try_from(self).map_err(|_| PoolError::overflow(self as u128, usize::MAX))
            }
        }
    )*};
}

macro_rules! impl_unsigned_length {
    ($($ty:ty),*) => {$(
        impl RequestedLength for $ty {
            #[inline]
            fn to_length(self) -> Result<usize> {
                usize::try_from(self).map_err(|_| PoolError::overflow(self as u128, usize::MAX))
            }
        }
    )*};
}

impl_signed_length!(i8, i16, i32, i64, i128, isize);
impl_unsigned_length!(u8, u16, u32, u64, u128, usize);

/// Largest element count a pool will hand out for `T`
///
/// Rust allocations are capped at `isize::MAX` bytes. Zero-sized types
/// never allocate but still build every element, so their arrays are
/// capped at [`MAX_ZERO_SIZED_LENGTH`] instead.
pub const fn max_array_length<T>() -> usize {
    let size = std::mem::size_of::<T>();
    if size == 0 {
        return MAX_ZERO_SIZED_LENGTH;
    }
    isize::MAX as usize / size
}

/// Reject lengths whose byte size would exceed the allocation limit
pub fn check_length<T>(len: usize) -> Result<usize> {
    let max = max_array_length::<T>();
    if len > max {
        return Err(PoolError::overflow(len as u128, max));
    }
    Ok(len)
}

/// Round up to the smallest power of two that is `>= len`
///
/// Powers of two, including 1, are returned unchanged. Returns `None` when
/// the result would not fit in `usize`. Zero rounds to 1, but callers short
/// circuit zero-length requests before rounding.
pub const fn round_up_to_power_of_two(len: usize) -> Option<usize> {
    len.checked_next_power_of_two()
}

/// Validate and round a minimum-length request
pub(crate) fn size_class<T>(len: usize) -> Result<usize> {
    check_length::<T>(len)?;
    let rounded = round_up_to_power_of_two(len)
        .ok_or_else(|| PoolError::overflow(len as u128, max_array_length::<T>()))?;
    check_length::<T>(rounded)
}
