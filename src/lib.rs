//! A segmented sieve of Eratosthenes generating primes and prime k-tuplets
//! (twins through septuplets) within an arbitrary interval `[start, stop]`,
//! `stop` up to 2^64 - 10*2^32.
//!
//! The sieve packs 30 numbers into each byte (only the residues coprime to
//! 30 need a bit), pre-sieves the smallest primes with a tiled pattern and
//! crosses off the remaining sieving primes with three strategies picked by
//! the ratio of prime to segment size. The sieving primes themselves come
//! from a second, L1-sized instance of the same sieve, bootstrapped by a
//! flat bit sieve up to `stop^(1/4)`.
//!
//! # Examples
//!
//! ```
//! // how many twin primes are there below one million?
//! let mut ps = segsieve::PrimeSieve::new();
//! assert_eq!(ps.count_twins(0, 1_000_000).unwrap(), 8_169);
//!
//! // stream the primes of an interval in ascending order
//! let mut sum = 0u64;
//! ps.generate_primes(100, 200, |p| sum += p).unwrap();
//! assert_eq!(sum, 3_167);
//! ```
//!
//! Use [`ParallelPrimeSieve`] to spread a large interval over a thread
//! pool; counts are identical to a serial run.

mod driver;
mod engine;
mod erat_big;
mod erat_medium;
mod erat_small;
mod error;
mod finder;
mod generator;
mod parallel;
mod presieve;
mod wheel;

pub use driver::PrimeSieve;
pub use error::{Error, MAX_STOP};
pub use parallel::ParallelPrimeSieve;

/// Counts the primes within `[start, stop]`.
pub fn count_primes(start: u64, stop: u64) -> Result<u64, Error> {
    PrimeSieve::new().count_primes(start, stop)
}

/// Calls `f` once per prime within `[start, stop]`, in ascending order.
pub fn generate_primes(start: u64, stop: u64, f: impl FnMut(u64)) -> Result<(), Error> {
    PrimeSieve::new().generate_primes(start, stop, f)
}

/// The n-th prime, 1-based: `nth_prime(1) == 2`.
pub fn nth_prime(n: u64) -> Result<u64, Error> {
    PrimeSieve::new().nth_prime(n)
}
