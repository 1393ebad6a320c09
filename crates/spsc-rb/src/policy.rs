//! Counter backends and the policies that select them.
//!
//! A [`Policy`] picks one [`CounterBackend`] implementation that both the
//! `head` and `tail` counters of a ring use, plus whether the ring keeps
//! producer/consumer-side shadow caches of the other role's counter.
//!
//! Four backends are provided, matching the four visibility regimes a
//! ring can be built with: [`Plain`], [`Volatile`], [`Atomic`] and
//! [`CachePaddedAtomic`]. `Atomic` is the sensible default for anything
//! shared across threads.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single unsigned counter with a uniform load/store/fetch-add interface.
///
/// Implementations that are not actually atomic (`Plain`, `Volatile`) ignore
/// the `order` argument; callers always pass the ordering that would be
/// correct for a genuinely atomic backend so that swapping the backend never
/// requires touching call sites.
pub trait CounterBackend: Default {
    fn new(value: u64) -> Self;
    fn load(&self, order: Ordering) -> u64;
    fn store(&self, value: u64, order: Ordering);

    /// `store(load() + delta)` with the same ordering as `store`. Only ever
    /// called by the counter's own owning role, so no read-modify-write
    /// atomicity is required across threads.
    fn fetch_add(&self, delta: u64, order: Ordering) -> u64 {
        let prev = self.load(Ordering::Relaxed);
        self.store(prev.wrapping_add(delta), order);
        prev
    }
}

/// Plain, non-atomic counter. No cross-thread ordering beyond program order.
///
/// Valid only when the ring is single-threaded or the two roles are
/// externally synchronized by some other means.
#[derive(Default)]
pub struct PlainCounter(UnsafeCell<u64>);

// SAFETY: callers of `Plain` accept responsibility for external synchronization.
unsafe impl Send for PlainCounter {}
unsafe impl Sync for PlainCounter {}

impl CounterBackend for PlainCounter {
    fn new(value: u64) -> Self {
        Self(UnsafeCell::new(value))
    }

    #[inline]
    fn load(&self, _order: Ordering) -> u64 {
        unsafe { *self.0.get() }
    }

    #[inline]
    fn store(&self, value: u64, _order: Ordering) {
        unsafe { *self.0.get() = value };
    }
}

/// Optimizer-opaque counter: reads/writes go through `read_volatile`/
/// `write_volatile` so the compiler cannot hoist or elide them, but there is
/// still no cross-thread memory-ordering guarantee. Intended for
/// single-stepping/debugging scenarios, not real multi-threaded use.
#[derive(Default)]
pub struct VolatileCounter(UnsafeCell<u64>);

unsafe impl Send for VolatileCounter {}
unsafe impl Sync for VolatileCounter {}

impl CounterBackend for VolatileCounter {
    fn new(value: u64) -> Self {
        Self(UnsafeCell::new(value))
    }

    #[inline]
    fn load(&self, _order: Ordering) -> u64 {
        unsafe { std::ptr::read_volatile(self.0.get()) }
    }

    #[inline]
    fn store(&self, value: u64, _order: Ordering) {
        unsafe { std::ptr::write_volatile(self.0.get(), value) };
    }
}

/// Atomic counter: release-store / acquire-load handshake between producer
/// and consumer. The default backend for anything shared across threads.
#[derive(Default)]
pub struct AtomicCounter(AtomicU64);

impl CounterBackend for AtomicCounter {
    fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    #[inline]
    fn load(&self, order: Ordering) -> u64 {
        self.0.load(order)
    }

    #[inline]
    fn store(&self, value: u64, order: Ordering) {
        self.0.store(value, order);
    }

    #[inline]
    fn fetch_add(&self, delta: u64, order: Ordering) -> u64 {
        self.0.fetch_add(delta, order)
    }
}

/// Same as [`AtomicCounter`], but padded to its own cache line so the
/// producer's and consumer's counters never false-share. Worth the extra
/// memory on high-throughput rings where the two roles run on separate
/// cores.
#[derive(Default)]
pub struct PaddedAtomicCounter(CachePadded<AtomicU64>);

impl CounterBackend for PaddedAtomicCounter {
    fn new(value: u64) -> Self {
        Self(CachePadded::new(AtomicU64::new(value)))
    }

    #[inline]
    fn load(&self, order: Ordering) -> u64 {
        self.0.load(order)
    }

    #[inline]
    fn store(&self, value: u64, order: Ordering) {
        self.0.store(value, order);
    }

    #[inline]
    fn fetch_add(&self, delta: u64, order: Ordering) -> u64 {
        self.0.fetch_add(delta, order)
    }
}

/// Selects a [`CounterBackend`] and whether the ring keeps shadow caches of
/// the opposite role's counter. Implemented by the four zero-sized tag
/// types [`Plain`], [`Volatile`], [`Atomic`], [`CachePaddedAtomic`]; pick
/// one as the `P` type parameter of a container.
pub trait Policy: Default + Copy + 'static {
    type Counter: CounterBackend;

    /// Whether shadow caches are worth keeping for this backend. Only
    /// meaningful (and only enabled) for the atomic backends: `Plain` and
    /// `Volatile` rings are either single-threaded or already paying for
    /// external synchronization, so a shadow buys nothing.
    const SHADOW_CACHE: bool;
}

/// Single-threaded or externally-synchronized use. See [`PlainCounter`].
#[derive(Clone, Copy, Default)]
pub struct Plain;

impl Policy for Plain {
    type Counter = PlainCounter;
    const SHADOW_CACHE: bool = false;
}

/// Debugging/stepping use. See [`VolatileCounter`].
#[derive(Clone, Copy, Default)]
pub struct Volatile;

impl Policy for Volatile {
    type Counter = VolatileCounter;
    const SHADOW_CACHE: bool = false;
}

/// Default multi-threaded policy. See [`AtomicCounter`].
#[derive(Clone, Copy, Default)]
pub struct Atomic;

impl Policy for Atomic {
    type Counter = AtomicCounter;
    const SHADOW_CACHE: bool = true;
}

/// High-throughput multi-threaded policy with false-sharing isolation. See
/// [`PaddedAtomicCounter`].
#[derive(Clone, Copy, Default)]
pub struct CachePaddedAtomic;

impl Policy for CachePaddedAtomic {
    type Counter = PaddedAtomicCounter;
    const SHADOW_CACHE: bool = true;
}
