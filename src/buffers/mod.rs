//! Pooled buffer handles and views
//!
//! This module provides the handle types callers rent from and return to an
//! [`ArrayPool`](crate::ArrayPool), plus the length rules applied to every
//! rent request.

pub mod array;
pub mod length;
pub mod slice;

// Re-export main types
pub use array::{ArrayMut, ArrayRef, PooledArray};
pub use length::{check_length, max_array_length, round_up_to_power_of_two, RequestedLength};
pub use slice::PooledSlice;
