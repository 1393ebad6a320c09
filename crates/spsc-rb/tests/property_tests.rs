//! Property-based tests for the universal invariants a valid ring must hold
//! after any sequence of single-threaded operations.
//!
//! Coverage:
//! - [`Fifo`] (owning, dynamic capacity)
//! - [`StaticFifo`] (owning, compile-time capacity)
//! - [`Pool`] (owning, raw-byte payloads)

use proptest::prelude::*;
use spsc_rb::{Atomic, Fifo, Pool, StaticFifo};

// size/free/empty/full/can_read/can_write agree with each other.
fn check_universal_invariants(size: usize, free: usize, capacity: usize, empty: bool, full: bool) {
    assert_eq!(size + free, capacity, "size + free != capacity");
    assert!(size <= capacity, "size > capacity");
    assert!(free <= capacity, "free > capacity");
    assert_eq!(empty, size == 0, "empty() disagrees with size()");
    assert_eq!(full, size == capacity, "full() disagrees with size()");
}

proptest! {
    /// Universal size/free/empty/full invariants hold after any sequence of
    /// pushes/pops on a dynamic fifo.
    #[test]
    fn prop_fifo_universal_invariants(
        ops in prop::collection::vec(prop::bool::ANY, 1..200),
    ) {
        let ring: Fifo<u64, Atomic> = Fifo::new(16).unwrap();
        let mut next = 0u64;

        for push in ops {
            if push {
                ring.try_push(next);
                next += 1;
            } else {
                ring.try_pop();
            }
            check_universal_invariants(
                ring.size(), ring.free(), ring.capacity(), ring.empty(), ring.full(),
            );
        }
    }

    /// publish(n) / pop(n) change size by exactly n when n is within bounds.
    #[test]
    fn prop_fifo_bulk_commit_changes_size_by_exactly_n(
        to_write in 0usize..20,
        to_read in 0usize..20,
    ) {
        let ring: Fifo<u32, Atomic> = Fifo::new(16).unwrap();

        let before = ring.size();
        let mut claim = ring.claim_write(to_write);
        let claimed = claim.claimed();
        while claim.remaining() > 0 {
            if !claim.emplace_next(7) { break; }
        }
        let published = claim.commit();
        prop_assert_eq!(published, claimed.min(ring.capacity()));
        prop_assert_eq!(ring.size(), before + published);

        let before = ring.size();
        let read = ring.claim_read(to_read);
        let len = read.len();
        let popped = read.commit();
        prop_assert_eq!(popped, len);
        prop_assert_eq!(ring.size(), before - popped);
    }

    /// Every bulk claim's regions sum to its reported total, and the total
    /// never exceeds what was requested or what was available.
    #[test]
    fn prop_fifo_claim_regions_sum_to_total(
        pre_fill in 0usize..16,
        pre_drain in 0usize..16,
        max in 0usize..32,
    ) {
        let ring: Fifo<u32, Atomic> = Fifo::new(16).unwrap();
        for i in 0..pre_fill { let _ = ring.try_push(i as u32); }
        for _ in 0..pre_drain { let _ = ring.try_pop(); }

        let free_before = ring.free();
        let claim = ring.claim_write(max);
        prop_assert!(claim.claimed() <= max.min(free_before));
        claim.cancel();

        let size_before = ring.size();
        let read = ring.claim_read(max);
        prop_assert!(read.len() <= max.min(size_before));
        read.cancel();
    }

    /// FIFO order survives any interleaving of pushes and pops, as long as
    /// nothing overflows.
    #[test]
    fn prop_fifo_order_preserved(
        ops in prop::collection::vec(prop::bool::ANY, 1..100),
    ) {
        let ring: Fifo<u64, Atomic> = Fifo::new(32).unwrap();
        let mut expected = std::collections::VecDeque::new();
        let mut next = 0u64;

        for push in ops {
            if push {
                if ring.try_push(next) {
                    expected.push_back(next);
                }
                next += 1;
            } else if let Some(&front) = ring.try_front() {
                prop_assert_eq!(Some(front), expected.pop_front());
                ring.pop();
            } else {
                prop_assert_eq!(expected.front(), None);
            }
        }
    }

    /// A snapshot's iterator yields exactly the logical contents at capture
    /// time, unaffected by later pushes.
    #[test]
    fn prop_snapshot_round_trip(
        values in prop::collection::vec(0u64..1000, 0..16),
    ) {
        let ring: Fifo<u64, Atomic> = Fifo::new(16).unwrap();
        for &v in &values {
            let _ = ring.try_push(v);
        }
        let pushed = values.len().min(16);

        let snapshot = ring.make_snapshot();
        let captured: Vec<u64> = snapshot.iter().copied().collect();
        prop_assert_eq!(captured.len(), pushed);
        prop_assert_eq!(captured, values[..pushed].to_vec());

        // Pushing more afterward must not perturb the already-taken snapshot.
        let _ = ring.try_push(99999);
        let captured_again: Vec<u64> = snapshot.iter().copied().collect();
        prop_assert_eq!(captured_again, values[..pushed].to_vec());
    }

    /// try_consume rejects a snapshot captured from a different ring.
    #[test]
    fn prop_snapshot_identity_rejection(
        values in prop::collection::vec(0u64..1000, 1..8),
    ) {
        let a: Fifo<u64, Atomic> = Fifo::new(16).unwrap();
        let b: Fifo<u64, Atomic> = Fifo::new(16).unwrap();
        for &v in &values {
            let _ = a.try_push(v);
        }
        let snapshot = a.make_snapshot();
        prop_assert!(!b.try_consume(&snapshot));
    }

    /// try_consume rejects a snapshot once the tail has moved past its
    /// capture point.
    #[test]
    fn prop_snapshot_staleness_rejection(
        values in prop::collection::vec(0u64..1000, 1..8),
    ) {
        let ring: Fifo<u64, Atomic> = Fifo::new(16).unwrap();
        for &v in &values {
            let _ = ring.try_push(v);
        }
        let snapshot = ring.make_snapshot();
        ring.pop();
        prop_assert!(!ring.try_consume(&snapshot));
    }
}

proptest! {
    /// The same universal invariants, this time over a compile-time-sized
    /// fifo.
    #[test]
    fn prop_static_fifo_universal_invariants(
        ops in prop::collection::vec(prop::bool::ANY, 1..200),
    ) {
        let ring: StaticFifo<u64, 16, Atomic> = StaticFifo::new();
        let mut next = 0u64;

        for push in ops {
            if push {
                ring.try_push(next);
                next += 1;
            } else {
                ring.try_pop();
            }
            check_universal_invariants(
                ring.size(), ring.free(), ring.capacity(), ring.empty(), ring.full(),
            );
        }
    }
}

proptest! {
    /// The same counter/geometry invariants hold over a pool regardless of
    /// whether slots are values or raw byte buffers.
    #[test]
    fn prop_pool_universal_invariants(
        payload in prop::collection::vec(any::<u8>(), 8),
        ops in prop::collection::vec(prop::bool::ANY, 1..100),
    ) {
        let pool: Pool<Atomic> = Pool::new(16, 8).unwrap();

        for push in ops {
            if push {
                unsafe { pool.try_push(payload.as_ptr(), payload.len()) };
            } else {
                pool.try_pop();
            }
            check_universal_invariants(
                pool.size(), pool.free(), pool.capacity(), pool.empty(), pool.full(),
            );
        }
    }

    /// Pool round-trips payload bytes exactly through try_push/try_pop_into.
    #[test]
    fn prop_pool_byte_round_trip(
        payload in prop::collection::vec(any::<u8>(), 8),
    ) {
        let pool: Pool<Atomic> = Pool::new(4, 8).unwrap();
        prop_assert!(unsafe { pool.try_push(payload.as_ptr(), payload.len()) });
        let mut out = vec![0u8; 8];
        prop_assert!(pool.try_pop_into(&mut out));
        prop_assert_eq!(out, payload);
    }
}
