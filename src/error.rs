//! Error types for the `segsieve` crate.

/// Largest value `start` and `stop` may take: the cross-off tiers advance a
/// multiple by up to ten times a 32-bit sieving prime past `stop`, and that
/// arithmetic must not wrap around 2^64.
pub const MAX_STOP: u64 = u64::MAX - 10 * (1 << 32);

/// Errors raised by the sieve configuration and accessors. Every error is
/// reported synchronously by the call that caused it; a failed call leaves
/// no partial results behind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `start` or `stop` exceeds [`MAX_STOP`].
    #[error("bound {0} out of range, start and stop must be <= 2^64 - 10*2^32 - 1")]
    BoundTooLarge(u64),

    /// `stop` is smaller than `start`.
    #[error("empty interval: stop {stop} is smaller than start {start}")]
    StopBeforeStart { start: u64, stop: u64 },

    /// The flags word uses bits reserved for internal use.
    #[error("invalid flags {0:#x}, flags must be below 2^20")]
    InvalidFlags(u32),

    /// A count accessor was asked for an arity beyond septuplets.
    #[error("count index {0} out of range, expected 0..=6")]
    CountIndex(usize),
}
