//! Parallel sieving over disjoint sub-intervals.
//!
//! [`ParallelPrimeSieve`] splits `[start, stop]` into equal-width chunks,
//! runs an independent [`PrimeSieve`] per chunk on a rayon pool and sums
//! the per-worker counts. The workers share nothing but the status object.
//!
//! Chunk boundaries are aligned to numbers congruent 1 modulo 30, the last
//! value of a sieve byte: every k-tuplet pattern lies inside a single
//! 30-window, so no tuplet can straddle two workers and the summed counts
//! equal a serial run's. Printing and callbacks need their output in
//! ascending order, which the serial path provides; those flags fall back
//! to it.

use std::time::Instant;

use rayon::prelude::*;

use crate::driver::PrimeSieve;
use crate::error::Error;

/// Below this interval width a worker is not worth spawning.
const MIN_WORKER_INTERVAL: u64 = 1_000_000;

/// A [`PrimeSieve`] that distributes its interval over a thread pool.
///
/// ```
/// let mut ps = segsieve::ParallelPrimeSieve::new();
/// ps.set_num_threads(4);
/// assert_eq!(ps.count_primes(0, 10_000_000).unwrap(), 664_579);
/// ```
pub struct ParallelPrimeSieve {
    base: PrimeSieve,
    num_threads: Option<usize>,
}

impl ParallelPrimeSieve {
    pub fn new() -> Self {
        ParallelPrimeSieve { base: PrimeSieve::new(), num_threads: None }
    }

    /// Caps the number of worker threads; defaults to rayon's pool size.
    pub fn set_num_threads(&mut self, threads: usize) {
        self.num_threads = Some(threads.max(1));
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }

    pub fn set_start(&mut self, start: u64) -> Result<(), Error> {
        self.base.set_start(start)
    }

    pub fn set_stop(&mut self, stop: u64) -> Result<(), Error> {
        self.base.set_stop(stop)
    }

    pub fn set_sieve_size(&mut self, kilobytes: u32) {
        self.base.set_sieve_size(kilobytes)
    }

    pub fn set_pre_sieve_limit(&mut self, limit: u32) {
        self.base.set_pre_sieve_limit(limit)
    }

    pub fn set_flags(&mut self, flags: u32) -> Result<(), Error> {
        self.base.set_flags(flags)
    }

    pub fn add_flags(&mut self, flags: u32) -> Result<(), Error> {
        self.base.add_flags(flags)
    }

    pub fn flags(&self) -> u32 {
        self.base.flags()
    }

    pub fn counts(&self) -> &[u64; 7] {
        self.base.counts()
    }

    pub fn count(&self, index: usize) -> Result<u64, Error> {
        self.base.count(index)
    }

    pub fn prime_count(&self) -> u64 {
        self.base.prime_count()
    }

    pub fn status(&self) -> f64 {
        self.base.status()
    }

    pub fn seconds(&self) -> f64 {
        self.base.seconds()
    }

    /// Sieves `[start, stop]` with the current flags across the pool.
    pub fn sieve_interval(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_start(start)?;
        self.set_stop(stop)?;
        self.sieve()
    }

    pub fn sieve(&mut self) -> Result<(), Error> {
        let start = self.base.start();
        let stop = self.base.stop();
        if stop < start {
            return Err(Error::StopBeforeStart { start, stop });
        }
        let workers = self.worker_count(start, stop);
        let ordered_output =
            self.base.flags() & PrimeSieve::PRINT_FLAGS != 0 || self.base.is_flag(PrimeSieve::CALLBACK_FLAGS);
        if workers <= 1 || ordered_output {
            // printing and callbacks promise ascending order
            return self.base.sieve();
        }

        let clock = Instant::now();
        self.base.reset_for_parallel_run();
        let chunks = split_interval(start, stop, workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("if the platform can spawn threads, then this call will work");
        let counts: Result<Vec<[u64; 7]>, Error> = pool.install(|| {
            chunks
                .par_iter()
                .map(|&(chunk_start, chunk_stop)| {
                    let mut worker = PrimeSieve::worker_of(&self.base);
                    worker.sieve_interval(chunk_start, chunk_stop)?;
                    Ok(worker.take_counts())
                })
                .collect()
        });
        self.base.absorb_counts(&counts?);
        self.base.finish_parallel_run(clock.elapsed().as_secs_f64());
        Ok(())
    }

    /// Counts the primes within `[start, stop]` across the pool.
    pub fn count_primes(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.set_flags(PrimeSieve::COUNT_PRIMES)?;
        self.sieve_interval(start, stop)?;
        Ok(self.base.prime_count())
    }

    fn worker_count(&self, start: u64, stop: u64) -> usize {
        let interval = stop - start + 1;
        let useful = (interval / MIN_WORKER_INTERVAL).max(1);
        (self.num_threads() as u64).min(useful) as usize
    }
}

impl Default for ParallelPrimeSieve {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `[start, stop]` into `n` sub-intervals of roughly equal width.
/// Interior boundaries are moved down to the nearest number congruent
/// 1 mod 30 so that no sieve byte, and hence no tuplet, spans two chunks.
fn split_interval(start: u64, stop: u64, n: usize) -> Vec<(u64, u64)> {
    let width = (stop - start + 1) / n as u64;
    let mut chunks = Vec::with_capacity(n);
    let mut chunk_start = start;
    for k in 1..n as u64 {
        let raw = start + k * width;
        let boundary = align_down(raw);
        if boundary <= chunk_start || boundary >= stop {
            continue;
        }
        chunks.push((chunk_start, boundary));
        chunk_start = boundary + 1;
    }
    chunks.push((chunk_start, stop));
    chunks
}

/// Largest value <= `x` congruent 1 modulo 30.
fn align_down(x: u64) -> u64 {
    let r = x % 30;
    if r >= 1 {
        x - r + 1
    } else {
        x - 29
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_the_interval_without_overlap() {
        let chunks = split_interval(0, 50_000_000, 8);
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[0].0, 0);
        assert_eq!(chunks.last().unwrap().1, 50_000_000);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].1 + 1, pair[1].0);
            // boundary sits between two sieve bytes
            assert_eq!(pair[0].1 % 30, 1);
        }
    }

    #[test]
    fn align_down_is_congruent_one() {
        for x in [1u64, 2, 29, 30, 31, 32, 59, 60, 61, 1_000_000] {
            let a = align_down(x);
            assert!(a <= x);
            assert_eq!(a % 30, 1);
            assert!(x - a < 30);
        }
    }

    #[test]
    fn parallel_counts_match_serial() {
        let mut serial = PrimeSieve::new();
        serial
            .set_flags(PrimeSieve::COUNT_PRIMES | PrimeSieve::COUNT_TWINS | PrimeSieve::COUNT_TRIPLETS)
            .unwrap();
        serial.sieve_interval(0, 10_000_000).unwrap();

        let mut parallel = ParallelPrimeSieve::new();
        parallel.set_num_threads(4);
        parallel
            .set_flags(PrimeSieve::COUNT_PRIMES | PrimeSieve::COUNT_TWINS | PrimeSieve::COUNT_TRIPLETS)
            .unwrap();
        parallel.sieve_interval(0, 10_000_000).unwrap();

        assert_eq!(parallel.counts(), serial.counts());
        assert_eq!(parallel.prime_count(), 664_579);
    }

    #[test]
    fn small_intervals_fall_back_to_serial() {
        let mut parallel = ParallelPrimeSieve::new();
        parallel.set_num_threads(8);
        assert_eq!(parallel.count_primes(0, 100).unwrap(), 25);
        assert_eq!(parallel.count_primes(1_000, 2_000).unwrap(), 135);
    }

    #[test]
    fn interval_not_divisible_by_workers() {
        let mut parallel = ParallelPrimeSieve::new();
        parallel.set_num_threads(3);
        let split = parallel.count_primes(17, 7_654_321).unwrap();
        let mut serial = PrimeSieve::new();
        assert_eq!(split, serial.count_primes(17, 7_654_321).unwrap());
    }
}
