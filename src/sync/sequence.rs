//! Slot states and buffer identities
//!
//! Every slot in a [`ConcurrentBag`](super::ConcurrentBag) carries one atomic
//! word. The word is either one of the reserved [`special`] values or the
//! identity of the buffer stored in the slot, so membership checks are a
//! single atomic load per slot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a pooled buffer
pub type BufferId = u64;

/// Reserved slot state values
pub mod special {
    use super::BufferId;

    /// Slot holds nothing
    pub const EMPTY: BufferId = 0;
    /// Slot is claimed by a thread that is moving a value in or out
    pub const CLAIMED: BufferId = 1;
    /// First identity handed out to a buffer
    pub const FIRST_ID: BufferId = 2;
}

/// Allocate the next buffer identity
///
/// Identities are never reused for the lifetime of the process.
pub fn next_buffer_id() -> BufferId {
    static NEXT_ID: AtomicU64 = AtomicU64::new(special::FIRST_ID);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Atomic state word of a bag slot
#[derive(Debug)]
pub struct SlotState {
    value: AtomicU64,
}

impl SlotState {
    /// Create an empty slot state
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(special::EMPTY),
        }
    }

    /// Load the current state with acquire ordering
    #[inline]
    pub fn load_acquire(&self) -> BufferId {
        self.value.load(Ordering::Acquire)
    }

    /// Try to move the slot from `expected` to CLAIMED
    ///
    /// On success the caller owns the slot's value cell until it calls
    /// [`publish`](Self::publish) or [`release`](Self::release).
    #[inline]
    pub fn try_claim(&self, expected: BufferId) -> bool {
        self.value
            .compare_exchange(expected, special::CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Publish a freshly written value under `id`
    #[inline]
    pub fn publish(&self, id: BufferId) {
        debug_assert!(Self::is_occupied(id), "published a reserved state");
        self.value.store(id, Ordering::Release);
    }

    /// Mark a claimed slot empty again
    #[inline]
    pub fn release(&self) {
        self.value.store(special::EMPTY, Ordering::Release);
    }

    /// Whether a state value denotes a stored buffer
    #[inline]
    pub fn is_occupied(state: BufferId) -> bool {
        state >= special::FIRST_ID
    }

    /// Whether a state value denotes an empty slot
    #[inline]
    pub fn is_empty(state: BufferId) -> bool {
        state == special::EMPTY
    }
}

impl Default for SlotState {
    fn default() -> Self {
        Self::new()
    }
}
