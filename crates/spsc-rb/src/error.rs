//! Construction-time errors.
//!
//! The hot path (push/pop/claim/publish/consume) never returns a `Result`;
//! failures there are reported as `bool`/`Option` exactly as documented on
//! each method. These errors only cover the cold path: building or growing
//! an owning container from a requested capacity/buffer size.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("requested capacity {requested} exceeds the unambiguous counter range ({max})")]
    CapacityTooLarge { requested: usize, max: u64 },

    #[error("zero capacity is not allowed here; use `0` explicitly only to detach")]
    ZeroCapacity,

    #[error("requested buffer size {requested} exceeds the unambiguous counter range ({max})")]
    BufferSizeTooLarge { requested: usize, max: u64 },

    #[error("storage pointer is not aligned to the required {required}-byte boundary")]
    Misaligned { required: usize },

    #[error("resize to {requested} would shrink below the current capacity {current}; only growth is supported")]
    ShrinkNotSupported { requested: usize, current: usize },

    #[error("allocation failed for {requested} slots")]
    AllocationFailed { requested: usize },
}
