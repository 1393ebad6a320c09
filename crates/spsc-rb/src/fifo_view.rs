//! `FifoView<T, P>`: a non-owning fifo over caller-provided storage.
//!
//! Used to overlay a ring protocol on memory this crate did not allocate
//! (a shared-memory segment, a slab owned by something else). The view
//! never allocates or frees; `attach`/`detach` only change what pointer the
//! view's operations target.

use crate::core::RingCore;
use crate::error::RingError;
use crate::geometry::{Geometry, RB_MAX_UNAMBIGUOUS};
use crate::guard::{BulkReadGuard, BulkWriteGuard, ReadGuard, WriteGuard};
use crate::policy::{Atomic, Policy};
use crate::snapshot::Snapshot;

/// Non-owning counterpart of [`crate::fifo::Fifo`]. `T: Default` is
/// required by [`FifoView::adopt`] the same way [`crate::fifo::Fifo::new`]
/// requires it: attaching to fresh storage pre-fills it so every slot is a
/// valid `&T`/`&mut T` before the first assignment.
pub struct FifoView<T, P: Policy = Atomic> {
    core: RingCore<P>,
    data: *mut T,
}

unsafe impl<T: Send, P: Policy> Send for FifoView<T, P> {}
unsafe impl<T: Send, P: Policy> Sync for FifoView<T, P> {}

impl<T, P: Policy> FifoView<T, P> {
    /// A view attached to nothing; `is_valid()` is `false` and every
    /// operation behaves as on a zero-capacity ring.
    pub fn detached() -> Self {
        Self {
            core: RingCore::detached(),
            data: std::ptr::null_mut(),
        }
    }

    /// Attaches to `capacity` slots of already-initialized storage at
    /// `data`, with the ring's own `head`/`tail` state given explicitly
    /// (typically recovered from a prior session over the same memory).
    /// Does not touch the contents of `data`. Refuses with
    /// [`RingError::Misaligned`] if `data` isn't aligned to `align_of::<T>()`.
    ///
    /// # Safety
    /// `data` must be valid for `capacity` reads and writes of `T` for as
    /// long as this view is attached, and no other writer may touch it
    /// except through the producer/consumer protocol this view enforces.
    pub unsafe fn attach(
        data: *mut T,
        capacity: usize,
        head: u64,
        tail: u64,
    ) -> Result<Self, RingError> {
        if (data as usize) % std::mem::align_of::<T>() != 0 {
            return Err(RingError::Misaligned {
                required: std::mem::align_of::<T>(),
            });
        }
        let geometry =
            Geometry::try_init(capacity, head, tail).ok_or(RingError::CapacityTooLarge {
                requested: capacity,
                max: RB_MAX_UNAMBIGUOUS,
            })?;
        Ok(Self {
            core: RingCore::new(geometry, head, tail),
            data,
        })
    }

    /// Detaches this view, returning it to the [`Self::detached`] state.
    /// The caller remains responsible for the storage it was pointing at.
    pub fn detach(&mut self) {
        self.core = RingCore::detached();
        self.data = std::ptr::null_mut();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.core.is_valid() && !self.data.is_null()
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

    /// Current `(head, tail)`, for persisting across a detach or handing to
    /// another process that will re-`attach`.
    #[inline]
    pub fn state(&self) -> (u64, u64) {
        (self.core.head_acquire(), self.core.tail_acquire())
    }

    pub fn try_push(&self, value: T) -> bool {
        if self.core.producer_free() == 0 {
            return false;
        }
        let idx = self.core.write_index();
        unsafe { *self.data.add(idx) = value };
        self.core.increment_head();
        true
    }

    pub fn push(&self, value: T) {
        let ok = self.try_push(value);
        debug_assert!(ok, "spsc-rb: push() on a full fifo view");
    }

    pub fn try_front(&self) -> Option<&T> {
        if self.core.consumer_size() == 0 {
            return None;
        }
        Some(unsafe { &*self.data.add(self.core.read_index()) })
    }

    pub fn try_pop(&self) -> bool {
        self.try_read().commit()
    }

    pub fn try_claim(&self) -> WriteGuard<'_, T, P> {
        if self.core.producer_free() == 0 {
            return WriteGuard::inactive(&self.core);
        }
        let ptr = unsafe { self.data.add(self.core.write_index()) };
        unsafe { WriteGuard::new(&self.core, ptr, true) }
    }

    pub fn try_read(&self) -> ReadGuard<'_, T, P> {
        if self.core.consumer_size() == 0 {
            return ReadGuard::inactive(&self.core);
        }
        let ptr = unsafe { self.data.add(self.core.read_index()) as *const T };
        unsafe { ReadGuard::new(&self.core, ptr, true) }
    }

    pub fn claim_write(&self, max: usize) -> BulkWriteGuard<'_, T, P> {
        let regions = self.core.claim_write_indices(max);
        if regions.is_empty() {
            return BulkWriteGuard::inactive(&self.core);
        }
        unsafe {
            BulkWriteGuard::new(
                &self.core,
                self.data.add(regions.first.start),
                regions.first.count,
                if regions.second.is_empty() {
                    std::ptr::null_mut()
                } else {
                    self.data.add(regions.second.start)
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
        let data = self.data as *const T;
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
        Snapshot::capture(&self.core, self.data as *const T)
    }

    pub fn try_consume(&self, snapshot: &Snapshot<'_, T>) -> bool {
        snapshot.try_consume(&self.core, self.data as *const T)
    }

    pub fn consume_all(&self) {
        self.core.sync_tail_to_head();
    }
}

impl<T: Default, P: Policy> FifoView<T, P> {
    /// Attaches to raw, possibly-garbage memory of at least `capacity`
    /// slots, pre-filling it with `T::default()` and resetting `head`/
    /// `tail` to zero. Use this instead of [`Self::attach`] when the
    /// storage has no prior ring session to recover state from.
    ///
    /// # Safety
    /// Same obligations as [`Self::attach`].
    pub unsafe fn adopt(data: *mut T, capacity: usize) -> Result<Self, RingError> {
        if (data as usize) % std::mem::align_of::<T>() != 0 {
            return Err(RingError::Misaligned {
                required: std::mem::align_of::<T>(),
            });
        }
        let geometry =
            Geometry::try_init(capacity, 0, 0).ok_or(RingError::CapacityTooLarge {
                requested: capacity,
                max: RB_MAX_UNAMBIGUOUS,
            })?;
        for i in 0..geometry.capacity() {
            data.add(i).write(T::default());
        }
        Ok(Self {
            core: RingCore::new(geometry, 0, 0),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Atomic;

    #[test]
    fn attach_over_a_default_filled_buffer_round_trips() {
        let mut storage = vec![0i32; 8];
        let view: FifoView<i32, Atomic> =
            unsafe { FifoView::adopt(storage.as_mut_ptr(), 8).unwrap() };
        assert!(view.try_push(1));
        assert!(view.try_push(2));
        assert_eq!(view.try_front().copied(), Some(1));
        assert!(view.try_pop());
        assert_eq!(view.try_front().copied(), Some(2));
    }

    #[test]
    fn detach_then_reattach_preserves_indices() {
        let mut storage = vec![0i32; 8];
        let mut view: FifoView<i32, Atomic> =
            unsafe { FifoView::adopt(storage.as_mut_ptr(), 8).unwrap() };
        view.try_push(10);
        view.try_push(11);
        let (head, tail) = view.state();
        view.detach();
        assert!(!view.is_valid());

        let view2: FifoView<i32, Atomic> =
            unsafe { FifoView::attach(storage.as_mut_ptr(), 8, head, tail).unwrap() };
        assert_eq!(view2.size(), 2);
        assert_eq!(view2.try_front().copied(), Some(10));
    }

    #[test]
    fn detached_view_is_inert() {
        let view: FifoView<i32, Atomic> = FifoView::detached();
        assert!(!view.is_valid());
        assert!(!view.try_push(1));
        assert_eq!(view.try_front(), None);
    }

    #[test]
    fn attach_refuses_misaligned_storage() {
        // A u64-backed buffer over-aligns; carve out a byte offset of 1 to
        // guarantee the resulting pointer is not `align_of::<u64>()`-aligned.
        let mut storage = vec![0u64; 9];
        let misaligned = unsafe { (storage.as_mut_ptr() as *mut u8).add(1) as *mut u64 };
        let result = unsafe { FifoView::<u64, Atomic>::attach(misaligned, 8, 0, 0) };
        assert_eq!(
            result.unwrap_err(),
            RingError::Misaligned {
                required: std::mem::align_of::<u64>()
            }
        );
    }
}
