//! Lock-free synchronization primitives backing the bucket store
//!
//! - Atomic slot states that double as buffer identities
//! - A segmented, append-only concurrent multiset
//! - No locks on the rent/return path

pub mod bag;
pub mod sequence;

pub use bag::ConcurrentBag;
pub use sequence::{next_buffer_id, BufferId, SlotState};
