//! Lock-free concurrent multiset keyed by buffer identity
//!
//! The bag is a singly linked chain of slot segments. Segments are only ever
//! appended, never unlinked, so a reader walking the chain can never observe
//! freed memory. Each slot's state word doubles as the key of the value it
//! holds (see [`special`]), which makes `contains` and keyed removal a scan
//! of atomic loads with no separate index.
//!
//! Every operation is O(capacity) in the worst case. Membership checks on
//! the return path are linear on purpose; a hash index would add a second
//! structure that has to be kept consistent with the slots.
//!
//! Capacity only grows. After a burst the chain keeps its high-water slot
//! count, and `pop`, `remove` and `contains` keep scanning all of it even
//! once the bag is empty again. Trimming a bucket releases buffers, not
//! slots.

use std::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    ptr,
    sync::atomic::{AtomicPtr, AtomicUsize, Ordering},
};

use super::sequence::{special, BufferId, SlotState};

/// Slots in the first segment of a bag
pub const INITIAL_SEGMENT_SLOTS: usize = 32;

/// Upper bound on the slot count of a single segment
pub const MAX_SEGMENT_SLOTS: usize = 4096;

struct Slot<V> {
    state: SlotState,
    value: UnsafeCell<MaybeUninit<V>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            state: SlotState::new(),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

struct Segment<V> {
    slots: Box<[Slot<V>]>,
    next: AtomicPtr<Segment<V>>,
}

impl<V> Segment<V> {
    fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(|_| Slot::new()).collect(),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl<V> Drop for Segment<V> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if SlotState::is_occupied(slot.state.load_acquire()) {
                // SAFETY: an occupied state means the value cell was written
                // and not yet moved out; we have exclusive access in drop.
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
        }

        let next = *self.next.get_mut();
        if !next.is_null() {
            // SAFETY: `next` came from Box::into_raw in `next_or_grow` and is
            // owned exclusively by this segment.
            drop(unsafe { Box::from_raw(next) });
        }
    }
}

/// Lock-free multiset of values tagged with a [`BufferId`]
pub struct ConcurrentBag<V> {
    head: Box<Segment<V>>,
    len: AtomicUsize,
}

// SAFETY: values are only ever moved in and out of slots by the thread that
// claimed the slot, never shared by reference, so `V: Send` is sufficient.
unsafe impl<V: Send> Send for ConcurrentBag<V> {}
unsafe impl<V: Send> Sync for ConcurrentBag<V> {}

impl<V> ConcurrentBag<V> {
    /// Create an empty bag
    pub fn new() -> Self {
        Self {
            head: Box::new(Segment::new(INITIAL_SEGMENT_SLOTS)),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of values currently stored
    ///
    /// Approximate while other threads are pushing or popping.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the bag currently holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots across all segments
    pub fn capacity(&self) -> usize {
        self.segments().map(|segment| segment.slots.len()).sum()
    }

    /// Insert `value` under `id`
    ///
    /// Duplicate ids are allowed; the bag is a multiset.
    pub fn push(&self, id: BufferId, value: V) {
        debug_assert!(SlotState::is_occupied(id), "bag keys must be buffer ids");

        let mut segment: &Segment<V> = &self.head;
        loop {
            for slot in segment.slots.iter() {
                if SlotState::is_empty(slot.state.load_acquire())
                    && slot.state.try_claim(special::EMPTY)
                {
                    // SAFETY: the slot is CLAIMED by us, nobody else touches the cell.
                    unsafe { (*slot.value.get()).write(value) };
                    // Count before publishing so a racing pop never underflows.
                    self.len.fetch_add(1, Ordering::AcqRel);
                    slot.state.publish(id);
                    return;
                }
            }
            segment = self.next_or_grow(segment);
        }
    }

    /// Remove and return any value
    pub fn pop(&self) -> Option<(BufferId, V)> {
        for segment in self.segments() {
            for slot in segment.slots.iter() {
                let state = slot.state.load_acquire();
                if SlotState::is_occupied(state) && slot.state.try_claim(state) {
                    // SAFETY: claimed an occupied slot, the value is initialised
                    // and we are the only thread allowed to move it out.
                    let value = unsafe { (*slot.value.get()).assume_init_read() };
                    slot.state.release();
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    return Some((state, value));
                }
            }
        }
        None
    }

    /// Remove and return one value stored under `id`
    pub fn remove(&self, id: BufferId) -> Option<V> {
        for segment in self.segments() {
            for slot in segment.slots.iter() {
                if slot.state.load_acquire() == id && slot.state.try_claim(id) {
                    // SAFETY: as in `pop`.
                    let value = unsafe { (*slot.value.get()).assume_init_read() };
                    slot.state.release();
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    return Some(value);
                }
            }
        }
        None
    }

    /// Whether at least one value is stored under `id`
    pub fn contains(&self, id: BufferId) -> bool {
        self.segments()
            .flat_map(|segment| segment.slots.iter())
            .any(|slot| slot.state.load_acquire() == id)
    }

    fn segments(&self) -> Segments<'_, V> {
        Segments {
            current: Some(&self.head),
        }
    }

    fn next_or_grow<'a>(&'a self, segment: &'a Segment<V>) -> &'a Segment<V> {
        let next = segment.next.load(Ordering::Acquire);
        if !next.is_null() {
            // SAFETY: segments are never freed while the bag is alive.
            return unsafe { &*next };
        }

        let slot_count = (segment.slots.len() * 2).min(MAX_SEGMENT_SLOTS);
        let fresh = Box::into_raw(Box::new(Segment::new(slot_count)));
        match segment.next.compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // SAFETY: `fresh` is now owned by the chain and lives as long as the bag.
            Ok(_) => unsafe { &*fresh },
            Err(existing) => {
                // SAFETY: `fresh` was never shared; another thread linked first.
                drop(unsafe { Box::from_raw(fresh) });
                unsafe { &*existing }
            }
        }
    }
}

impl<V> Default for ConcurrentBag<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for ConcurrentBag<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentBag")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

struct Segments<'a, V> {
    current: Option<&'a Segment<V>>,
}

impl<'a, V> Iterator for Segments<'a, V> {
    type Item = &'a Segment<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.current?;
        let next = segment.next.load(Ordering::Acquire);
        // SAFETY: linked segments outlive the borrow of the bag.
        self.current = unsafe { next.as_ref() };
        Some(segment)
    }
}
