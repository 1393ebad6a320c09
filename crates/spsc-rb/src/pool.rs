//! `Pool<P>`: an owning ring of pointers into a backing allocation of
//! equal-size byte buffers.
//!
//! Unlike [`crate::fifo::Fifo`], the ring core here never holds a value; it
//! holds a `*mut u8` into a buffer that lives in a separate, flat allocation.
//! Producer/consumer operations move payload bytes through that pointer with
//! raw `memcpy`-style copies bounded by `buffer_size()`, never by `size_of`
//! a Rust type the pool doesn't know about.

use crate::core::RingCore;
use crate::error::RingError;
use crate::geometry::{Geometry, RB_MAX_UNAMBIGUOUS};
use crate::guard::{
    BulkPoolReadGuard, BulkPoolWriteGuard, PoolReadGuard, PoolWriteGuard,
};
use crate::policy::{Atomic, Policy};
use crate::region::Regions;
use crate::snapshot::Snapshot;
use std::cell::UnsafeCell;

/// An owning pool of `buffer_size`-byte slots. `P` selects the counter
/// backend (see [`crate::policy`]); defaults to [`Atomic`].
pub struct Pool<P: Policy = Atomic> {
    core: RingCore<P>,
    table: UnsafeCell<Box<[*mut u8]>>,
    bytes: UnsafeCell<Box<[u8]>>,
    buffer_size: usize,
}

// SAFETY: same discipline as `Fifo`. The ring protocol partitions table
// entries (and the bytes they point into) between producer and consumer at
// any instant; non-concurrent operations require a quiesced caller.
unsafe impl<P: Policy> Send for Pool<P> {}
unsafe impl<P: Policy> Sync for Pool<P> {}

impl<P: Policy> Pool<P> {
    /// Allocates a pool of at least `requested_capacity` slots (rounded up
    /// to the next power of two, floor 2), each `buffer_size` bytes.
    pub fn new(requested_capacity: usize, buffer_size: usize) -> Result<Self, RingError> {
        if requested_capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        if (buffer_size as u64) > RB_MAX_UNAMBIGUOUS {
            return Err(RingError::BufferSizeTooLarge {
                requested: buffer_size,
                max: RB_MAX_UNAMBIGUOUS,
            });
        }
        let geometry = Geometry::try_init_with_buffer_size(requested_capacity, buffer_size, 0, 0)
            .ok_or(RingError::CapacityTooLarge {
                requested: requested_capacity,
                max: RB_MAX_UNAMBIGUOUS,
            })?;
        let capacity = geometry.capacity();
        let (bytes, table) = Self::alloc_backing(capacity, buffer_size)?;
        Ok(Self {
            core: RingCore::new(geometry, 0, 0),
            table: UnsafeCell::new(table),
            bytes: UnsafeCell::new(bytes),
            buffer_size,
        })
    }

    fn alloc_backing(
        capacity: usize,
        buffer_size: usize,
    ) -> Result<(Box<[u8]>, Box<[*mut u8]>), RingError> {
        let total = capacity
            .checked_mul(buffer_size)
            .ok_or(RingError::AllocationFailed {
                requested: capacity,
            })?;
        let mut bytes = vec![0u8; total].into_boxed_slice();
        let base = bytes.as_mut_ptr();
        let table = (0..capacity)
            .map(|i| unsafe { base.add(i * buffer_size) })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok((bytes, table))
    }

    /// Grow-only resize of depth and/or buffer size. `new_depth <=
    /// capacity()` and `new_buffer_size <= buffer_size()` together are a
    /// no-op success. Otherwise both dimensions grow to at least their
    /// current value, live slots are relocated in logical order into
    /// `[0, size)` of the new table, and each live payload is copied
    /// (`min(old buffer_size, new buffer_size)` bytes, no zero-padding of
    /// the grown remainder). On failure the existing storage is untouched.
    pub fn resize(&mut self, new_depth: usize, new_buffer_size: usize) -> Result<(), RingError> {
        let old_cap = self.core.capacity();
        let old_buffer_size = self.buffer_size;
        if new_depth <= old_cap && new_buffer_size <= old_buffer_size {
            return Ok(());
        }
        let target_depth = new_depth.max(old_cap);
        let target_buffer_size = new_buffer_size.max(old_buffer_size);
        if (target_buffer_size as u64) > RB_MAX_UNAMBIGUOUS {
            return Err(RingError::BufferSizeTooLarge {
                requested: target_buffer_size,
                max: RB_MAX_UNAMBIGUOUS,
            });
        }
        let geometry = Geometry::try_init_with_buffer_size(target_depth, target_buffer_size, 0, 0)
            .ok_or(RingError::CapacityTooLarge {
                requested: target_depth,
                max: RB_MAX_UNAMBIGUOUS,
            })?;

        let size = self.core.size() as usize;
        let copy_len = old_buffer_size.min(target_buffer_size);
        let (new_bytes, new_table) = Self::alloc_backing(geometry.capacity(), target_buffer_size)?;
        {
            let old_table = self.table.get_mut();
            let tail_phys = self.core.read_index();
            let old_mask = self.core.mask();
            for i in 0..size {
                let from = (tail_phys + i) & old_mask;
                let src = old_table[from];
                let dst = new_table[i];
                if copy_len > 0 {
                    unsafe { std::ptr::copy_nonoverlapping(src, dst, copy_len) };
                }
            }
        }
        *self.bytes.get_mut() = new_bytes;
        *self.table.get_mut() = new_table;
        self.buffer_size = target_buffer_size;
        self.core.init(geometry, size as u64, 0);
        Ok(())
    }
}

impl<P: Policy> Pool<P> {
    #[inline]
    fn table_ptr(&self) -> *mut *mut u8 {
        unsafe { (*self.table.get()).as_mut_ptr() }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.core.is_valid()
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

    // -- producer: raw byte copy ----------------------------------------------

    /// Copies `min(n, buffer_size())` bytes from `src` into the next free
    /// slot and publishes. `n` beyond `buffer_size()` is silently truncated,
    /// matching the non-Result hot path the rest of the engine uses.
    ///
    /// # Safety
    /// `src` must be valid for reads of `n` bytes.
    pub unsafe fn try_push(&self, src: *const u8, n: usize) -> bool {
        let mut guard = self.try_claim();
        if !guard.is_active() {
            return false;
        }
        let len = n.min(self.buffer_size);
        let slot = guard.slot_ptr().expect("spsc-rb: active PoolWriteGuard with no slot");
        if len > 0 {
            std::ptr::copy_nonoverlapping(src, slot, len);
        }
        guard.arm_publish();
        guard.commit()
    }

    /// # Safety
    /// `src` must be valid for reads of `n` bytes.
    pub unsafe fn push(&self, src: *const u8, n: usize) {
        let ok = self.try_push(src, n);
        debug_assert!(ok, "spsc-rb: push() on a full pool");
    }

    // -- producer: zero-copy, single slot --------------------------------------

    pub fn try_claim(&self) -> PoolWriteGuard<'_, P> {
        if self.core.producer_free() == 0 {
            return PoolWriteGuard::inactive(&self.core, self.buffer_size);
        }
        let idx = self.core.write_index();
        let slot = unsafe { *self.table_ptr().add(idx) };
        unsafe { PoolWriteGuard::new(&self.core, slot, self.buffer_size, true) }
    }

    pub fn claim(&self) -> PoolWriteGuard<'_, P> {
        let guard = self.try_claim();
        debug_assert!(guard.is_active(), "spsc-rb: claim() on a full pool");
        guard
    }

    // -- producer: zero-copy, bulk ---------------------------------------------

    /// Raw accessor: hands back pointers-to-table-entries for up to `max`
    /// claimed slots, without dereferencing or null-checking them. That is
    /// the caller's contract; see [`Self::claim_write`] for the guarded,
    /// null-safe equivalent.
    pub fn claim_write_raw(&self, max: usize) -> Regions<*mut u8> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return Regions::empty();
        }
        unsafe { regions.into_regions::<*mut u8>(self.table_ptr()) }
    }

    pub fn claim_write(&self, max: usize) -> BulkPoolWriteGuard<'_, P> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return BulkPoolWriteGuard::inactive(&self.core, self.buffer_size);
        }
        let table = self.table_ptr() as *const *mut u8;
        unsafe {
            BulkPoolWriteGuard::new(
                &self.core,
                table.add(regions.first.start),
                regions.first.count,
                if regions.second.is_empty() {
                    std::ptr::null()
                } else {
                    table.add(regions.second.start)
                },
                regions.total,
                self.buffer_size,
            )
        }
    }

    // -- consumer: raw byte copy ------------------------------------------------

    /// Copies `min(dst.len(), buffer_size())` bytes from the front slot into
    /// `dst` and pops. Fails without copying if the pool is empty.
    pub fn try_pop_into(&self, dst: &mut [u8]) -> bool {
        let guard = self.try_front();
        let Some(slot) = guard.slot_ptr() else {
            return false;
        };
        let len = dst.len().min(self.buffer_size);
        if len > 0 {
            unsafe { std::ptr::copy_nonoverlapping(slot, dst.as_mut_ptr(), len) };
        }
        guard.commit()
    }

    // -- consumer: zero-copy, single slot --------------------------------------

    pub fn try_front(&self) -> PoolReadGuard<'_, P> {
        if self.core.consumer_size() == 0 {
            return PoolReadGuard::inactive(&self.core, self.buffer_size);
        }
        let idx = self.core.read_index();
        let slot = unsafe { *self.table_ptr().add(idx) as *const u8 };
        unsafe { PoolReadGuard::new(&self.core, slot, self.buffer_size, true) }
    }

    pub fn try_pop(&self) -> bool {
        self.try_front().commit()
    }

    pub fn pop(&self) {
        let ok = self.try_pop();
        debug_assert!(ok, "spsc-rb: pop() on an empty pool");
    }

    // -- consumer: zero-copy, bulk ----------------------------------------------

    pub fn claim_read(&self, max: usize) -> BulkPoolReadGuard<'_, P> {
        let regions = self.core.claim_read_indices(max);
        if regions.is_empty() {
            return BulkPoolReadGuard::inactive(&self.core, self.buffer_size);
        }
        let table = self.table_ptr() as *const *mut u8;
        unsafe {
            BulkPoolReadGuard::new(
                &self.core,
                table.add(regions.first.start),
                regions.first.count,
                if regions.second.is_empty() {
                    std::ptr::null()
                } else {
                    table.add(regions.second.start)
                },
                regions.second.count,
                regions.total,
                self.buffer_size,
            )
        }
    }

    // -- snapshot & consume protocol --------------------------------------------

    /// A snapshot of the table (not the payload bytes): `iter()` yields the
    /// table entries live at capture time, each still subject to the same
    /// null-slot defense as any other pool accessor.
    pub fn make_snapshot(&self) -> Snapshot<'_, *mut u8> {
        Snapshot::capture(&self.core, self.table_ptr() as *const *mut u8)
    }

    pub fn try_consume(&self, snapshot: &Snapshot<'_, *mut u8>) -> bool {
        snapshot.try_consume(&self.core, self.table_ptr() as *const *mut u8)
    }

    pub fn consume_all(&self) {
        self.core.sync_tail_to_head();
    }

    // -- non-concurrent lifecycle ------------------------------------------------

    pub fn clear(&mut self) {
        self.core.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Atomic;

    fn pool(capacity: usize, buffer_size: usize) -> Pool<Atomic> {
        Pool::new(capacity, buffer_size).unwrap()
    }

    #[test]
    fn push_pop_round_trips_bytes() {
        let p = pool(8, 4);
        let src = [1u8, 2, 3, 4];
        assert!(unsafe { p.try_push(src.as_ptr(), 4) });
        let mut dst = [0u8; 4];
        assert!(p.try_pop_into(&mut dst));
        assert_eq!(dst, src);
        assert!(p.empty());
    }

    #[test]
    fn claim_returns_full_buffer_and_publishes_on_write() {
        let p = pool(4, 8);
        let mut guard = p.claim();
        assert!(guard.write(&[9, 9, 9]));
        assert!(guard.commit());
        assert_eq!(p.size(), 1);
    }

    #[test]
    fn bulk_claim_write_splits_at_wrap_like_fifo() {
        let p = pool(4, 4);
        for _ in 0..3 {
            assert!(unsafe { p.try_push([7u8; 4].as_ptr(), 4) });
        }
        assert_eq!(p.try_pop(), true);
        let mut guard = p.claim_write(4);
        assert_eq!(guard.claimed(), 2);
        assert!(guard.write_next(&[1, 1, 1, 1]));
        assert!(guard.write_next(&[2, 2, 2, 2]));
        assert_eq!(guard.commit(), 2);
    }

    #[test]
    fn claim_write_raw_exposes_table_entries_without_dereferencing() {
        let p = pool(4, 4);
        let regions = p.claim_write_raw(4);
        assert_eq!(regions.total, 4);
        assert!(!regions.first.ptr.is_null());
    }

    #[test]
    fn resize_grows_depth_and_buffer_size_preserving_order() {
        let mut p = pool(4, 4);
        for b in [[1u8; 4], [2u8; 4], [3u8; 4]] {
            assert!(unsafe { p.try_push(b.as_ptr(), 4) });
        }
        assert_eq!(p.try_pop(), true);
        p.resize(8, 8).unwrap();
        assert_eq!(p.capacity(), 8);
        assert_eq!(p.buffer_size(), 8);
        let mut dst = [0u8; 8];
        assert!(p.try_pop_into(&mut dst));
        assert_eq!(&dst[..4], &[2u8; 4]);
    }
}
