//! `StaticFifo<T, N, P>`: a fifo with its buffer embedded directly in the
//! struct, no heap allocation.
//!
//! Requires `T: Default` for the same reason [`crate::fifo::Fifo`] does:
//! slots are pre-filled so producer/consumer code always sees a valid `T`,
//! never a `MaybeUninit`.

use crate::core::RingCore;
use crate::geometry::Geometry;
use crate::guard::{BulkReadGuard, BulkWriteGuard, ReadGuard, WriteGuard};
use crate::policy::{Atomic, Policy};
use crate::snapshot::Snapshot;

/// Compile-time assertion that `N` is a power of two the ring core can use
/// directly as its capacity (no rounding at runtime, unlike the dynamic
/// [`crate::fifo::Fifo`]).
const fn assert_power_of_two(n: usize) {
    assert!(n >= 2, "StaticFifo capacity must be at least 2");
    assert!(n.is_power_of_two(), "StaticFifo capacity must be a power of 2");
}

pub struct StaticFifo<T, const N: usize, P: Policy = Atomic> {
    core: RingCore<P>,
    buffer: std::cell::UnsafeCell<[T; N]>,
}

unsafe impl<T: Send, const N: usize, P: Policy> Send for StaticFifo<T, N, P> {}
unsafe impl<T: Send, const N: usize, P: Policy> Sync for StaticFifo<T, N, P> {}

impl<T: Default, const N: usize, P: Policy> StaticFifo<T, N, P> {
    pub fn new() -> Self {
        assert_power_of_two(N);
        let geometry = Geometry::try_init(N, 0, 0).expect("StaticFifo: N within range");
        Self {
            core: RingCore::new(geometry, 0, 0),
            buffer: std::cell::UnsafeCell::new(std::array::from_fn(|_| T::default())),
        }
    }
}

impl<T: Default, const N: usize, P: Policy> Default for StaticFifo<T, N, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, P: Policy> StaticFifo<T, N, P> {
    #[inline]
    fn data_ptr(&self) -> *mut T {
        self.buffer.get().cast::<T>()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.core.size() as usize
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.core.free() as usize
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.core.empty()
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.core.full()
    }

    pub fn try_push(&self, value: T) -> bool {
        if self.core.producer_free() == 0 {
            return false;
        }
        let idx = self.core.write_index();
        unsafe { *self.data_ptr().add(idx) = value };
        self.core.increment_head();
        true
    }

    pub fn push(&self, value: T) {
        let ok = self.try_push(value);
        debug_assert!(ok, "spsc-rb: push() on a full StaticFifo");
    }

    pub fn try_front(&self) -> Option<&T> {
        if self.core.consumer_size() == 0 {
            return None;
        }
        Some(unsafe { &*self.data_ptr().add(self.core.read_index()) })
    }

    pub fn try_pop(&self) -> bool {
        self.try_read().commit()
    }

    pub fn pop(&self) {
        let ok = self.try_pop();
        debug_assert!(ok, "spsc-rb: pop() on an empty StaticFifo");
    }

    pub fn try_claim(&self) -> WriteGuard<'_, T, P> {
        if self.core.producer_free() == 0 {
            return WriteGuard::inactive(&self.core);
        }
        let ptr = unsafe { self.data_ptr().add(self.core.write_index()) };
        unsafe { WriteGuard::new(&self.core, ptr, true) }
    }

    pub fn try_read(&self) -> ReadGuard<'_, T, P> {
        if self.core.consumer_size() == 0 {
            return ReadGuard::inactive(&self.core);
        }
        let ptr = unsafe { self.data_ptr().add(self.core.read_index()) as *const T };
        unsafe { ReadGuard::new(&self.core, ptr, true) }
    }

    pub fn claim_write(&self, max: usize) -> BulkWriteGuard<'_, T, P> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return BulkWriteGuard::inactive(&self.core);
        }
        let data = self.data_ptr();
        unsafe {
            BulkWriteGuard::new(
                &self.core,
                data.add(regions.first.start),
                regions.first.count,
                if regions.second.is_empty() {
                    std::ptr::null_mut()
                } else {
                    data.add(regions.second.start)
                },
                regions.total,
            )
        }
    }

    pub fn claim_read(&self, max: usize) -> BulkReadGuard<'_, T, P> {
        let regions = self.core.claim_read_indices(max);
        if regions.is_empty() {
            return BulkReadGuard::inactive(&self.core);
        }
        let data = self.data_ptr() as *const T;
        unsafe {
            BulkReadGuard::new(
                &self.core,
                data.add(regions.first.start),
                regions.first.count,
                if regions.second.is_empty() {
                    std::ptr::null()
                } else {
                    data.add(regions.second.start)
                },
                regions.second.count,
                regions.total,
            )
        }
    }

    pub fn make_snapshot(&self) -> Snapshot<'_, T> {
        Snapshot::capture(&self.core, self.data_ptr() as *const T)
    }

    pub fn try_consume(&self, snapshot: &Snapshot<'_, T>) -> bool {
        snapshot.try_consume(&self.core, self.data_ptr() as *const T)
    }

    pub fn consume_all(&self) {
        self.core.sync_tail_to_head();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Atomic;

    #[test]
    fn fixed_capacity_round_trip() {
        let r: StaticFifo<u64, 8, Atomic> = StaticFifo::new();
        for i in 0..8 {
            assert!(r.try_push(i));
        }
        assert!(!r.try_push(99));
        for i in 0..8 {
            assert_eq!(r.try_front().copied(), Some(i));
            assert!(r.try_pop());
        }
        assert!(r.empty());
    }

    #[test]
    fn bulk_claim_respects_wrap() {
        let r: StaticFifo<u32, 4, Atomic> = StaticFifo::new();
        r.push(1);
        r.push(2);
        r.push(3);
        assert_eq!(r.try_pop(), true);
        r.push(4);
        r.push(5);
        let read = r.claim_read(16);
        assert_eq!(read.len(), 4);
    }
}
