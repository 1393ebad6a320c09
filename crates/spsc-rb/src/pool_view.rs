//! `PoolView<P>`: a non-owning pool over a caller-provided slot table.
//!
//! The table is an array of `*mut u8` the view does not own; unlike
//! [`crate::pool::Pool`], entries may legitimately be null (a slot whose
//! backing buffer hasn't been wired up yet, or was deliberately cleared).
//! Every accessor that would dereference a table entry checks it first and
//! reports "no slot" rather than touching unmapped memory; the raw bulk
//! accessor is the one exception, by explicit contract (see
//! [`Self::claim_write_raw`]).

use crate::core::RingCore;
use crate::error::RingError;
use crate::geometry::{Geometry, RB_MAX_UNAMBIGUOUS};
use crate::guard::{
    BulkPoolReadGuard, BulkPoolWriteGuard, PoolReadGuard, PoolWriteGuard,
};
use crate::policy::{Atomic, Policy};
use crate::region::Regions;
use crate::snapshot::Snapshot;

/// Non-owning counterpart of [`crate::pool::Pool`].
pub struct PoolView<P: Policy = Atomic> {
    core: RingCore<P>,
    table: *mut *mut u8,
    buffer_size: usize,
}

unsafe impl<P: Policy> Send for PoolView<P> {}
unsafe impl<P: Policy> Sync for PoolView<P> {}

impl<P: Policy> PoolView<P> {
    /// A view attached to nothing; every operation behaves as on a
    /// zero-capacity ring.
    pub fn detached() -> Self {
        Self {
            core: RingCore::detached(),
            table: std::ptr::null_mut(),
            buffer_size: 0,
        }
    }

    /// Attaches to `capacity` table entries at `table`, each presumed to
    /// point at a `buffer_size`-byte buffer (or be null), with the ring's
    /// own `head`/`tail` given explicitly. Does not touch the table's
    /// contents — entries may already be null and stay that way.
    ///
    /// # Safety
    /// `table` must be valid for `capacity` reads/writes of `*mut u8` for as
    /// long as this view is attached; every non-null entry must be valid for
    /// `buffer_size` reads/writes of `u8` for as long as it remains reachable
    /// through the ring protocol.
    pub unsafe fn attach(
        table: *mut *mut u8,
        capacity: usize,
        buffer_size: usize,
        head: u64,
        tail: u64,
    ) -> Result<Self, RingError> {
        let geometry = Geometry::try_init_with_buffer_size(capacity, buffer_size, head, tail)
            .ok_or(RingError::CapacityTooLarge {
                requested: capacity,
                max: RB_MAX_UNAMBIGUOUS,
            })?;
        Ok(Self {
            core: RingCore::new(geometry, head, tail),
            table,
            buffer_size,
        })
    }

    /// Attaches to raw, possibly-garbage table memory, zeroing every entry
    /// to null and resetting `head`/`tail` to zero. Use when the table has
    /// no prior ring session to recover state from; every slot starts
    /// unmapped until the caller separately wires buffers into it.
    ///
    /// # Safety
    /// Same obligations as [`Self::attach`], except non-null entries are not
    /// required (there are none immediately after adopt).
    pub unsafe fn adopt(
        table: *mut *mut u8,
        capacity: usize,
        buffer_size: usize,
    ) -> Result<Self, RingError> {
        let geometry = Geometry::try_init_with_buffer_size(capacity, buffer_size, 0, 0).ok_or(
            RingError::CapacityTooLarge {
                requested: capacity,
                max: RB_MAX_UNAMBIGUOUS,
            },
        )?;
        for i in 0..geometry.capacity() {
            table.add(i).write(std::ptr::null_mut());
        }
        Ok(Self {
            core: RingCore::new(geometry, 0, 0),
            table,
            buffer_size,
        })
    }

    pub fn detach(&mut self) {
        self.core = RingCore::detached();
        self.table = std::ptr::null_mut();
        self.buffer_size = 0;
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
        self.core.is_valid() && !self.table.is_null()
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

    #[inline]
    pub fn state(&self) -> (u64, u64) {
        (self.core.head_acquire(), self.core.tail_acquire())
    }

    /// Directly sets the table entry at physical index `idx` to `slot` (or
    /// null). The caller is responsible for only pointing at buffers of at
    /// least `buffer_size()` bytes that outlive the entry's time in the
    /// ring.
    ///
    /// # Safety
    /// `idx` must be `< capacity()`; `slot` must be null or valid for
    /// `buffer_size()` reads/writes of `u8`.
    pub unsafe fn set_table_entry(&self, idx: usize, slot: *mut u8) {
        debug_assert!(idx < self.capacity(), "spsc-rb: pool_view set_table_entry out of range");
        self.table.add(idx).write(slot);
    }

    // -- producer: raw byte copy ----------------------------------------------

    /// # Safety
    /// `src` must be valid for reads of `n` bytes.
    pub unsafe fn try_push(&self, src: *const u8, n: usize) -> bool {
        let mut guard = self.try_claim();
        if !guard.is_active() {
            return false;
        }
        let len = n.min(self.buffer_size);
        let Some(slot) = guard.slot_ptr() else {
            return false;
        };
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
        debug_assert!(ok, "spsc-rb: push() on a full pool view");
    }

    // -- producer: zero-copy, single slot --------------------------------------

    /// Claims the next free table slot. Inactive (no-op) if the pool is
    /// full, or — the pool-specific case fifo views never have — if the
    /// claimed table entry is itself null; a null entry means "write
    /// nowhere", so the guard reports no slot rather than handing back a
    /// dangling target.
    pub fn try_claim(&self) -> PoolWriteGuard<'_, P> {
        if self.core.producer_free() == 0 {
            return PoolWriteGuard::inactive(&self.core, self.buffer_size);
        }
        let idx = self.core.write_index();
        let slot = unsafe { *self.table.add(idx) };
        if slot.is_null() {
            return PoolWriteGuard::inactive(&self.core, self.buffer_size);
        }
        unsafe { PoolWriteGuard::new(&self.core, slot, self.buffer_size, true) }
    }

    // -- producer: zero-copy, bulk ---------------------------------------------

    /// Raw accessor: hands back pointers-to-table-entries for up to `max`
    /// claimed slots, without dereferencing or null-checking them. A table
    /// entry read through the returned [`Regions`] may be null; it is the
    /// caller's contract to check before writing through it.
    pub fn claim_write_raw(&self, max: usize) -> Regions<*mut u8> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return Regions::empty();
        }
        unsafe { regions.into_regions::<*mut u8>(self.table) }
    }

    pub fn claim_write(&self, max: usize) -> BulkPoolWriteGuard<'_, P> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return BulkPoolWriteGuard::inactive(&self.core, self.buffer_size);
        }
        let table = self.table as *const *mut u8;
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

    // -- consumer: zero-copy, single slot --------------------------------------

    pub fn try_front(&self) -> PoolReadGuard<'_, P> {
        if self.core.consumer_size() == 0 {
            return PoolReadGuard::inactive(&self.core, self.buffer_size);
        }
        let idx = self.core.read_index();
        let slot = unsafe { *self.table.add(idx) };
        if slot.is_null() {
            return PoolReadGuard::inactive(&self.core, self.buffer_size);
        }
        unsafe { PoolReadGuard::new(&self.core, slot as *const u8, self.buffer_size, true) }
    }

    pub fn try_pop(&self) -> bool {
        self.try_front().commit()
    }

    /// Copies `min(dst.len(), buffer_size())` bytes from the front slot into
    /// `dst` and pops. Fails without copying if the pool is empty or the
    /// front table entry is null.
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

    // -- consumer: zero-copy, bulk ----------------------------------------------

    pub fn claim_read(&self, max: usize) -> BulkPoolReadGuard<'_, P> {
        let regions = self.core.claim_read_indices(max);
        if regions.is_empty() {
            return BulkPoolReadGuard::inactive(&self.core, self.buffer_size);
        }
        let table = self.table as *const *mut u8;
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

    pub fn make_snapshot(&self) -> Snapshot<'_, *mut u8> {
        Snapshot::capture(&self.core, self.table as *const *mut u8)
    }

    pub fn try_consume(&self, snapshot: &Snapshot<'_, *mut u8>) -> bool {
        snapshot.try_consume(&self.core, self.table as *const *mut u8)
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
    fn attach_over_a_null_filled_table_round_trips() {
        let mut table = [std::ptr::null_mut::<u8>(); 8];
        let mut backing = [0u8; 8 * 4];
        for i in 0..8 {
            table[i] = unsafe { backing.as_mut_ptr().add(i * 4) };
        }
        let view: PoolView<Atomic> =
            unsafe { PoolView::attach(table.as_mut_ptr(), 8, 4, 0, 0).unwrap() };
        assert!(unsafe { view.try_push([1u8, 2, 3, 4].as_ptr(), 4) });
        let mut dst = [0u8; 4];
        assert!(view.try_pop_into(&mut dst));
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn claim_over_a_null_table_entry_reports_no_slot_without_dereferencing() {
        let mut table = [std::ptr::null_mut::<u8>(); 8];
        // Slot 7 is deliberately left unmapped (null).
        let view: PoolView<Atomic> =
            unsafe { PoolView::attach(table.as_mut_ptr(), 8, 4, 7, 0).unwrap() };
        let guard = view.try_claim();
        assert!(!guard.is_active());
        assert_eq!(guard.slot_ptr(), None);
    }

    #[test]
    fn claim_write_raw_exposes_null_entries_without_dereferencing() {
        let mut table = [std::ptr::null_mut::<u8>(); 8];
        let view: PoolView<Atomic> =
            unsafe { PoolView::attach(table.as_mut_ptr(), 8, 4, 7, 0).unwrap() };
        let regions = view.claim_write_raw(1);
        assert_eq!(regions.total, 1);
        let entry = unsafe { *regions.first.ptr };
        assert!(entry.is_null());
    }

    #[test]
    fn adopt_nulls_every_entry() {
        let mut table = [0x1usize as *mut u8; 4];
        let view: PoolView<Atomic> = unsafe { PoolView::adopt(table.as_mut_ptr(), 4, 4).unwrap() };
        assert!(view.is_valid());
        for i in 0..4 {
            assert!(unsafe { *table.as_ptr().add(i) }.is_null());
        }
    }

    #[test]
    fn pool_null_slot_defense() {
        let mut table = [0x1usize as *mut u8; 16];
        table[7] = std::ptr::null_mut();
        let view: PoolView<Atomic> =
            unsafe { PoolView::attach(table.as_mut_ptr(), 16, 4, 7, 7).unwrap() };

        assert!(!view.try_claim().is_active());
        assert!(!unsafe { view.try_push([0u8; 4].as_ptr(), 4) });

        let regions = view.claim_write_raw(1);
        assert_eq!(regions.total, 1);
        assert_eq!(regions.first.count, 1);
        assert!(unsafe { *regions.first.ptr }.is_null());
    }

    #[test]
    fn detached_view_is_inert() {
        let view: PoolView<Atomic> = PoolView::detached();
        assert!(!view.is_valid());
        assert!(!view.try_claim().is_active());
        assert_eq!(view.try_front().slot_ptr(), None);
    }
}
