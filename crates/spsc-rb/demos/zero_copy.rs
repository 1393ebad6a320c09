//! Zero-copy producer/consumer over a `Fifo`, plus a raw-byte producer over
//! a `Pool`. Single producer thread, single consumer thread — this engine
//! is SPSC, not MPSC.

use spsc_rb::{Atomic, Fifo, Pool};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const CAPACITY: usize = 1 << 16;
const TOTAL: u64 = 20_000_000;
const BATCH: usize = 256;

fn fifo_demo() {
    println!("fifo zero-copy: {TOTAL} items through a capacity-{CAPACITY} ring\n");

    let ring: Arc<Fifo<u64, Atomic>> = Arc::new(Fifo::new(CAPACITY).unwrap());
    let start = Instant::now();

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        let mut sent = 0u64;
        while sent < TOTAL {
            let want = BATCH.min((TOTAL - sent) as usize);
            let mut claim = producer_ring.claim_write(want);
            let mut written = 0;
            while claim.remaining() > 0 {
                if !claim.emplace_next(sent + written as u64) {
                    break;
                }
                written += 1;
            }
            sent += claim.commit() as u64;
            if written == 0 {
                thread::yield_now();
            }
        }
    });

    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        let mut expected = 0u64;
        while received < TOTAL {
            let read = ring.claim_read(BATCH);
            for &v in read.first() {
                assert_eq!(v, expected);
                expected += 1;
            }
            for &v in read.second() {
                assert_eq!(v, expected);
                expected += 1;
            }
            let n = read.commit();
            received += n as u64;
            if n == 0 {
                thread::yield_now();
            }
        }
        received
    });

    producer.join().unwrap();
    let received = consumer.join().unwrap();
    let elapsed = start.elapsed();
    let rate = received as f64 / elapsed.as_secs_f64();
    println!("received {received} items in {elapsed:.2?} ({rate:.2} million/sec)\n");
}

fn pool_demo() {
    println!("pool raw-byte producer: one round of 8-byte payloads\n");

    let pool: Pool<Atomic> = Pool::new(64, 8).unwrap();
    for i in 0u64..40 {
        let bytes = i.to_le_bytes();
        let ok = unsafe { pool.try_push(bytes.as_ptr(), bytes.len()) };
        assert!(ok);
    }

    let mut total = 0u64;
    let mut out = [0u8; 8];
    while pool.try_pop_into(&mut out) {
        total += u64::from_le_bytes(out);
    }
    println!(
        "summed {total} across the drained payloads (expected {})",
        (0..40u64).sum::<u64>()
    );
}

fn main() {
    fifo_demo();
    pool_demo();
}
