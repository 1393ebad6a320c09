//! `RingCore`: two counters plus a geometry, and the whole producer/consumer
//! protocol. Storage-agnostic — it only ever hands back indices, never
//! pointers; containers own the physical array and turn indices into
//! addresses.

use crate::geometry::Geometry;
use crate::invariants::{
    debug_assert_bounded_size, debug_assert_monotonic, debug_assert_regions_sum_to_total,
};
use crate::policy::{CounterBackend, Policy};
use crate::region::{IndexRegion, IndexRegions};
use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;

/// Owns `head` (producer-owned), `tail` (consumer-owned), their shadow
/// caches, and the ring's [`Geometry`].
///
/// All hot-path methods take `&self`: the producer and consumer sides are
/// expected to share one `RingCore` by reference, synchronized entirely
/// through the counters' own release/acquire protocol.
pub struct RingCore<P: Policy> {
    /// Producer-owned: advances on publish.
    head: P::Counter,
    /// Consumer's private shadow of `head`, refreshed on an apparent-empty
    /// boundary. Written only by the consumer.
    cached_head: UnsafeCell<u64>,

    /// Consumer-owned: advances on pop.
    tail: P::Counter,
    /// Producer's private shadow of `tail`, refreshed on an apparent-full
    /// boundary. Written only by the producer.
    cached_tail: UnsafeCell<u64>,

    geometry: Geometry,
}

// SAFETY: `cached_head`/`cached_tail` are each written by exactly one role
// (consumer / producer respectively); the release/acquire handshake on
// `head`/`tail` is what makes that single-writer discipline sound across
// threads.
unsafe impl<P: Policy> Send for RingCore<P> {}
unsafe impl<P: Policy> Sync for RingCore<P> {}

impl<P: Policy> RingCore<P> {
    pub fn new(geometry: Geometry, head: u64, tail: u64) -> Self {
        let mut core = Self {
            head: P::Counter::new(head),
            cached_head: UnsafeCell::new(0),
            tail: P::Counter::new(tail),
            cached_tail: UnsafeCell::new(0),
            geometry,
        };
        core.sync_cache();
        core
    }

    pub fn detached() -> Self {
        Self::new(Geometry::detached(), 0, 0)
    }

    // -- geometry passthroughs -------------------------------------------------

    #[inline]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    #[inline]
    pub const fn mask(&self) -> usize {
        self.geometry.mask()
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.geometry.is_valid()
    }

    // -- authoritative predicates (role-agnostic) ------------------------------

    #[inline]
    pub fn head_relaxed(&self) -> u64 {
        self.head.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn head_acquire(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    #[inline]
    pub fn tail_relaxed(&self) -> u64 {
        self.tail.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn tail_acquire(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.head_acquire().wrapping_sub(self.tail_acquire())
    }

    #[inline]
    pub fn free(&self) -> u64 {
        (self.capacity() as u64).saturating_sub(self.size())
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.capacity() != 0 && self.size() == self.capacity() as u64
    }

    #[inline]
    pub fn can_read(&self, n: u64) -> bool {
        n <= self.size()
    }

    #[inline]
    pub fn can_write(&self, n: u64) -> bool {
        n <= self.free()
    }

    #[inline]
    pub fn write_index(&self) -> usize {
        if self.mask() == 0 {
            return 0;
        }
        (self.head_relaxed() as usize) & self.mask()
    }

    #[inline]
    pub fn read_index(&self) -> usize {
        if self.mask() == 0 {
            return 0;
        }
        (self.tail_relaxed() as usize) & self.mask()
    }

    #[inline]
    pub fn write_size(&self) -> usize {
        self.free().min((self.capacity() - self.write_index()) as u64) as usize
    }

    #[inline]
    pub fn read_size(&self) -> usize {
        self.size().min((self.capacity() - self.read_index()) as u64) as usize
    }

    // -- producer/consumer hot-path predicates (shadow-cache aware) ------------

    /// Free slots as observed by the producer, consulting (and lazily
    /// refreshing) its private shadow of `tail` before paying for an
    /// authoritative acquire-load.
    #[inline]
    pub fn producer_free(&self) -> u64 {
        let cap = self.capacity() as u64;
        if cap == 0 {
            return 0;
        }
        let head = self.head_relaxed();
        if P::SHADOW_CACHE {
            let cached_tail = unsafe { *self.cached_tail.get() };
            let used = head.wrapping_sub(cached_tail);
            if used < cap {
                return cap - used;
            }
        }
        let fresh_tail = self.tail.load(Ordering::Acquire);
        if P::SHADOW_CACHE {
            unsafe { *self.cached_tail.get() = fresh_tail };
        }
        cap.saturating_sub(head.wrapping_sub(fresh_tail))
    }

    /// Used slots as observed by the consumer, consulting (and lazily
    /// refreshing) its private shadow of `head`.
    #[inline]
    pub fn consumer_size(&self) -> u64 {
        let tail = self.tail_relaxed();
        if P::SHADOW_CACHE {
            let cached_head = unsafe { *self.cached_head.get() };
            let used = cached_head.wrapping_sub(tail);
            if used > 0 {
                return used;
            }
        }
        let fresh_head = self.head.load(Ordering::Acquire);
        if P::SHADOW_CACHE {
            unsafe { *self.cached_head.get() = fresh_head };
        }
        fresh_head.wrapping_sub(tail)
    }

    // -- producer mutations ------------------------------------------------

    #[inline]
    pub fn increment_head(&self) {
        self.advance_head(1);
    }

    #[inline]
    pub fn advance_head(&self, n: u64) {
        let old_head = self.head_relaxed();
        let new_head = old_head.wrapping_add(n);
        debug_assert_monotonic!("head", old_head, new_head);
        debug_assert_bounded_size!(
            new_head.wrapping_sub(self.tail_relaxed()),
            self.capacity() as u64
        );
        self.head.store(new_head, Ordering::Release);
    }

    // -- consumer mutations --------------------------------------------------

    #[inline]
    pub fn increment_tail(&self) {
        self.advance_tail(1);
    }

    #[inline]
    pub fn advance_tail(&self, n: u64) {
        let old_tail = self.tail_relaxed();
        let new_tail = old_tail.wrapping_add(n);
        debug_assert_monotonic!("tail", old_tail, new_tail);
        debug_assert_bounded_size!(
            self.head_relaxed().wrapping_sub(new_tail),
            self.capacity() as u64
        );
        self.tail.store(new_tail, Ordering::Release);
    }

    /// Sets `tail := head` atomically from the consumer side, discarding
    /// everything currently buffered.
    #[inline]
    pub fn sync_tail_to_head(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
        if P::SHADOW_CACHE {
            unsafe { *self.cached_head.get() = head };
        }
    }

    // -- non-concurrent transitions -------------------------------------------

    /// Resets both counters to zero and resynchronizes shadows. Caller must
    /// ensure producer and consumer are quiescent.
    pub fn clear(&mut self) {
        self.head = P::Counter::new(0);
        self.tail = P::Counter::new(0);
        self.sync_cache();
    }

    /// Full reinitialization with a new geometry and counter state. Caller
    /// must ensure producer and consumer are quiescent.
    pub fn init(&mut self, geometry: Geometry, head: u64, tail: u64) {
        self.geometry = geometry;
        self.head = P::Counter::new(head);
        self.tail = P::Counter::new(tail);
        self.sync_cache();
    }

    /// Resynchronizes both shadow caches with the authoritative counters.
    /// Mandatory at the end of every non-concurrent transition (init,
    /// clear, swap, move, adopt, attach) so neither shadow can leak stale
    /// state into the next epoch of use.
    pub fn sync_cache(&mut self) {
        if P::SHADOW_CACHE {
            let head = self.head.load(Ordering::Relaxed);
            let tail = self.tail.load(Ordering::Relaxed);
            *self.cached_head.get_mut() = head;
            *self.cached_tail.get_mut() = tail;
        }
    }

    // -- bulk region calculator -------------------------------------------------

    pub fn claim_write_indices(&self, max: usize) -> IndexRegions {
        let cap = self.capacity();
        if cap == 0 || max == 0 {
            return IndexRegions::empty();
        }
        let free = self.producer_free().min(cap as u64) as usize;
        let total = free.min(max);
        if total == 0 {
            return IndexRegions::empty();
        }
        let w = self.write_index();
        let first_n = (cap - w).min(total);
        let second_n = total - first_n;
        debug_assert_regions_sum_to_total!(first_n, second_n, total);
        IndexRegions {
            first: IndexRegion {
                start: w,
                count: first_n,
            },
            second: if second_n > 0 {
                IndexRegion {
                    start: 0,
                    count: second_n,
                }
            } else {
                IndexRegion::empty()
            },
            total,
        }
    }

    pub fn claim_read_indices(&self, max: usize) -> IndexRegions {
        let cap = self.capacity();
        if cap == 0 || max == 0 {
            return IndexRegions::empty();
        }
        let size = self.consumer_size().min(cap as u64) as usize;
        let total = size.min(max);
        if total == 0 {
            return IndexRegions::empty();
        }
        let r = self.read_index();
        let first_n = (cap - r).min(total);
        let second_n = total - first_n;
        debug_assert_regions_sum_to_total!(first_n, second_n, total);
        IndexRegions {
            first: IndexRegion {
                start: r,
                count: first_n,
            },
            second: if second_n > 0 {
                IndexRegion {
                    start: 0,
                    count: second_n,
                }
            } else {
                IndexRegion::empty()
            },
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Atomic;

    fn core(capacity: usize) -> RingCore<Atomic> {
        RingCore::new(Geometry::try_init(capacity, 0, 0).unwrap(), 0, 0)
    }

    #[test]
    fn starts_empty() {
        let c = core(8);
        assert!(c.empty());
        assert!(!c.full());
        assert_eq!(c.free(), 8);
    }

    #[test]
    fn advance_head_then_tail_round_trips() {
        let c = core(8);
        c.advance_head(5);
        assert_eq!(c.size(), 5);
        assert_eq!(c.free(), 3);
        c.advance_tail(2);
        assert_eq!(c.size(), 3);
        assert_eq!(c.free(), 5);
    }

    #[test]
    fn claim_write_splits_at_wrap() {
        let c = core(16);
        c.advance_head(15);
        c.advance_tail(14);
        // size = 1, write_index = 15, free = 15
        let r = c.claim_write_indices(6);
        assert_eq!(r.total, 6);
        assert_eq!(r.first, IndexRegion { start: 15, count: 1 });
        assert_eq!(r.second, IndexRegion { start: 0, count: 5 });
    }

    #[test]
    fn sync_tail_to_head_drains() {
        let c = core(8);
        c.advance_head(8);
        assert!(c.full());
        c.sync_tail_to_head();
        assert!(c.empty());
    }
}
