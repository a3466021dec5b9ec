//! The public sieve driver.
//!
//! [`PrimeSieve`] holds the user-facing configuration (interval, segment
//! size, pre-sieve limit, flags), seeds the primes and tuplets below the
//! wheel's range from a fixed table, assembles the finder / generator /
//! bootstrap pipeline for one `sieve()` run and keeps the resulting counts,
//! status and timing. No sieve state survives between runs.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bitvec::bitvec;

use crate::error::{Error, MAX_STOP};
use crate::finder::{PrimeCallback, PrimeFinder};
use crate::generator::PrimeGenerator;

/// Progress of a running sieve in percent, shared between the driver and
/// its finder (and, in parallel runs, between all workers and the parent).
/// Updated with relaxed atomics; the percentage is purely informational.
pub(crate) struct SieveStatus {
    total: AtomicU64,
    processed: AtomicU64,
    printed: AtomicU64,
    print: AtomicBool,
}

impl SieveStatus {
    pub fn new() -> Self {
        SieveStatus {
            total: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            printed: AtomicU64::new(0),
            print: AtomicBool::new(false),
        }
    }

    pub fn reset(&self, total: u64, print: bool) {
        self.total.store(total.max(1), Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.printed.store(0, Ordering::Relaxed);
        self.print.store(print, Ordering::Relaxed);
    }

    /// Records `amount` more numbers as sieved; emits a carriage-return
    /// updated percentage when printing is on and the percent ticked up.
    pub fn advance(&self, amount: u64) {
        let done = self.processed.fetch_add(amount, Ordering::Relaxed) + amount;
        if self.print.load(Ordering::Relaxed) {
            let total = self.total.load(Ordering::Relaxed);
            let percent = (done as u128 * 100 / total as u128).min(100) as u64;
            if percent > self.printed.fetch_max(percent, Ordering::Relaxed) {
                print!("\r{}%", percent);
                let _ = std::io::stdout().flush();
            }
        }
    }

    pub fn finish_all(&self) {
        let total = self.total.load(Ordering::Relaxed);
        let done = self.processed.swap(total, Ordering::Relaxed);
        if self.print.load(Ordering::Relaxed)
            && done < total
            && self.printed.fetch_max(100, Ordering::Relaxed) < 100
        {
            print!("\r100%");
            let _ = std::io::stdout().flush();
        }
    }

    pub fn percent(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let done = self.processed.load(Ordering::Relaxed);
        (done as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// Primes and tuplets with a member below 7 lie under the wheel's residue
/// range and are emitted from this table instead of the sieve.
struct SmallSeed {
    first: u64,
    last: u64,
    arity_index: usize,
    text: &'static str,
}

const SMALL_SEEDS: [SmallSeed; 8] = [
    SmallSeed { first: 2, last: 2, arity_index: 0, text: "2" },
    SmallSeed { first: 3, last: 3, arity_index: 0, text: "3" },
    SmallSeed { first: 5, last: 5, arity_index: 0, text: "5" },
    SmallSeed { first: 3, last: 5, arity_index: 1, text: "(3, 5)" },
    SmallSeed { first: 5, last: 7, arity_index: 1, text: "(5, 7)" },
    SmallSeed { first: 5, last: 11, arity_index: 2, text: "(5, 7, 11)" },
    SmallSeed { first: 5, last: 13, arity_index: 3, text: "(5, 7, 11, 13)" },
    SmallSeed { first: 5, last: 17, arity_index: 4, text: "(5, 7, 11, 13, 17)" },
];

/// A single-threaded segmented sieve of Eratosthenes computing primes and
/// prime k-tuplets within `[start, stop]`.
///
/// ```
/// let mut ps = segsieve::PrimeSieve::new();
/// assert_eq!(ps.count_primes(0, 100).unwrap(), 25);
/// assert_eq!(ps.count_twins(0, 100).unwrap(), 8);
/// ```
pub struct PrimeSieve {
    start: u64,
    stop: u64,
    /// Segment size in kilobytes, a power of two in [1, 4096].
    sieve_size: u32,
    pre_sieve_limit: u32,
    flags: u32,
    counts: [u64; 7],
    seconds: f64,
    status: Arc<SieveStatus>,
    /// Workers of a parallel sieve share their parent's status object and
    /// must not reset it.
    child: bool,
}

impl PrimeSieve {
    pub const COUNT_PRIMES: u32 = 1 << 0;
    pub const COUNT_TWINS: u32 = 1 << 1;
    pub const COUNT_TRIPLETS: u32 = 1 << 2;
    pub const COUNT_QUADRUPLETS: u32 = 1 << 3;
    pub const COUNT_QUINTUPLETS: u32 = 1 << 4;
    pub const COUNT_SEXTUPLETS: u32 = 1 << 5;
    pub const COUNT_SEPTUPLETS: u32 = 1 << 6;
    pub const PRINT_PRIMES: u32 = 1 << 7;
    pub const PRINT_TWINS: u32 = 1 << 8;
    pub const PRINT_TRIPLETS: u32 = 1 << 9;
    pub const PRINT_QUADRUPLETS: u32 = 1 << 10;
    pub const PRINT_QUINTUPLETS: u32 = 1 << 11;
    pub const PRINT_SEXTUPLETS: u32 = 1 << 12;
    pub const PRINT_SEPTUPLETS: u32 = 1 << 13;
    pub const PRINT_STATUS: u32 = 1 << 14;

    pub(crate) const COUNT_TUPLET_FLAGS: u32 = 0x7E;
    pub(crate) const PRINT_FLAGS: u32 = 0x3F80;
    /// Internal flag bits, rejected by `set_flags`.
    pub(crate) const CALLBACK32_PRIMES: u32 = 1 << 20;
    pub(crate) const CALLBACK64_PRIMES: u32 = 1 << 21;
    pub(crate) const CALLBACK_FLAGS: u32 = Self::CALLBACK32_PRIMES | Self::CALLBACK64_PRIMES;

    const DEFAULT_SIEVE_SIZE: u32 = 32;
    const DEFAULT_PRE_SIEVE: u32 = 19;

    pub fn new() -> Self {
        PrimeSieve {
            start: 0,
            stop: 0,
            sieve_size: Self::DEFAULT_SIEVE_SIZE,
            pre_sieve_limit: Self::DEFAULT_PRE_SIEVE,
            flags: Self::COUNT_PRIMES,
            counts: [0; 7],
            seconds: 0.0,
            status: Arc::new(SieveStatus::new()),
            child: false,
        }
    }

    /// A worker sieve for one sub-interval of a parallel run: same
    /// configuration, shared status.
    pub(crate) fn worker_of(parent: &PrimeSieve) -> Self {
        PrimeSieve {
            start: 0,
            stop: 0,
            sieve_size: parent.sieve_size,
            pre_sieve_limit: parent.pre_sieve_limit,
            flags: parent.flags,
            counts: [0; 7],
            seconds: 0.0,
            status: Arc::clone(&parent.status),
            child: true,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// Sieve start, `start <= `[`MAX_STOP`].
    pub fn set_start(&mut self, start: u64) -> Result<(), Error> {
        if start > MAX_STOP {
            return Err(Error::BoundTooLarge(start));
        }
        self.start = start;
        Ok(())
    }

    /// Sieve stop, `stop <= `[`MAX_STOP`].
    pub fn set_stop(&mut self, stop: u64) -> Result<(), Error> {
        if stop > MAX_STOP {
            return Err(Error::BoundTooLarge(stop));
        }
        self.stop = stop;
        Ok(())
    }

    /// Segment size in kilobytes. Clamped to [1, 4096] and rounded up to
    /// the next power of two; the best value is usually the L1 cache size,
    /// or the L2 size for stops beyond ~10^14.
    pub fn set_sieve_size(&mut self, kilobytes: u32) {
        self.sieve_size = kilobytes.clamp(1, 4096).next_power_of_two();
    }

    pub fn sieve_size(&self) -> u32 {
        self.sieve_size
    }

    /// Multiples of primes up to this limit are pre-sieved; clamped to
    /// [13, 23]. Larger limits sieve faster but the pattern memory grows
    /// with the primorial (7 MB at 23).
    pub fn set_pre_sieve_limit(&mut self, limit: u32) {
        self.pre_sieve_limit = limit.clamp(13, 23);
    }

    pub fn pre_sieve_limit(&self) -> u32 {
        self.pre_sieve_limit
    }

    /// The public flag bits of this sieve.
    pub fn flags(&self) -> u32 {
        self.flags & ((1 << 20) - 1)
    }

    pub fn set_flags(&mut self, flags: u32) -> Result<(), Error> {
        if flags >= 1 << 20 {
            return Err(Error::InvalidFlags(flags));
        }
        self.flags = flags;
        Ok(())
    }

    pub fn add_flags(&mut self, flags: u32) -> Result<(), Error> {
        if flags >= 1 << 20 {
            return Err(Error::InvalidFlags(flags));
        }
        self.flags |= flags;
        Ok(())
    }

    pub fn is_flag(&self, flags: u32) -> bool {
        self.flags & flags != 0
    }

    /// Count of primes (index 0) or k-tuplets (index k-1) of the last run.
    pub fn count(&self, index: usize) -> Result<u64, Error> {
        self.counts.get(index).copied().ok_or(Error::CountIndex(index))
    }

    pub fn counts(&self) -> &[u64; 7] {
        &self.counts
    }

    pub fn prime_count(&self) -> u64 {
        self.counts[0]
    }

    pub fn twin_count(&self) -> u64 {
        self.counts[1]
    }

    pub fn triplet_count(&self) -> u64 {
        self.counts[2]
    }

    pub fn quadruplet_count(&self) -> u64 {
        self.counts[3]
    }

    pub fn quintuplet_count(&self) -> u64 {
        self.counts[4]
    }

    pub fn sextuplet_count(&self) -> u64 {
        self.counts[5]
    }

    pub fn septuplet_count(&self) -> u64 {
        self.counts[6]
    }

    /// Progress of the current (or last) run in percent.
    pub fn status(&self) -> f64 {
        self.status.percent()
    }

    /// Wall time of the last `sieve()` in seconds.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub(crate) fn take_counts(&self) -> [u64; 7] {
        self.counts
    }

    pub(crate) fn reset_for_parallel_run(&mut self) {
        self.counts = [0; 7];
        self.status
            .reset(self.stop - self.start + 1, self.is_flag(Self::PRINT_STATUS));
    }

    pub(crate) fn absorb_counts(&mut self, worker_counts: &[[u64; 7]]) {
        for counts in worker_counts {
            for (total, found) in self.counts.iter_mut().zip(counts) {
                *total += found;
            }
        }
    }

    pub(crate) fn finish_parallel_run(&mut self, seconds: f64) {
        self.status.finish_all();
        self.seconds = seconds;
    }

    /// Sieves `[start, stop]` with the current flags.
    pub fn sieve(&mut self) -> Result<(), Error> {
        self.sieve_with(None)
    }

    /// Sieves `[start, stop]` with the current flags.
    pub fn sieve_interval(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_start(start)?;
        self.set_stop(stop)?;
        self.sieve()
    }

    fn sieve_with(&mut self, mut callback: Option<PrimeCallback<'_>>) -> Result<(), Error> {
        if self.stop < self.start {
            return Err(Error::StopBeforeStart { start: self.start, stop: self.stop });
        }
        let clock = Instant::now();
        self.counts = [0; 7];
        if !self.child {
            self.status
                .reset(self.stop - self.start + 1, self.is_flag(Self::PRINT_STATUS));
        }

        if self.start <= 5 {
            self.seed_small(&mut callback);
        }

        if self.stop >= 7 {
            let mut finder = PrimeFinder::new(
                self.start,
                self.stop,
                self.sieve_size as usize * 1024,
                self.pre_sieve_limit,
                self.flags,
                callback,
                Arc::clone(&self.status),
            );
            if finder.need_generator() {
                let mut generator = PrimeGenerator::new(&mut finder);
                Self::bootstrap(&mut generator);
                generator.finish();
            }
            finder.finish();
            for (total, found) in self.counts.iter_mut().zip(finder.counts()) {
                *total += found;
            }
        }

        if !self.child {
            self.status.finish_all();
        }
        self.seconds = clock.elapsed().as_secs_f64();
        Ok(())
    }

    /// Flat odd-only sieve producing the generator's sieving primes, i.e.
    /// the primes up to the fourth root of `stop`. Small enough to stay in
    /// cache; this ends the recursion at two levels.
    fn bootstrap(generator: &mut PrimeGenerator<'_, '_>) {
        let limit = generator.sqrt_stop();
        let mut composite = bitvec![0; limit as usize + 1];
        let mut i = 3u64;
        while i * i <= limit {
            if !composite[i as usize] {
                let mut multiple = i * i;
                while multiple <= limit {
                    composite.set(multiple as usize, true);
                    multiple += 2 * i;
                }
            }
            i += 2;
        }
        let mut p = (generator.pre_sieve_limit() as u64 + 1) | 1;
        while p <= limit {
            if !composite[p as usize] {
                generator.sieve(p);
            }
            p += 2;
        }
    }

    /// Emits the primes and tuplets with a member below the wheel range.
    fn seed_small(&mut self, callback: &mut Option<PrimeCallback<'_>>) {
        for seed in &SMALL_SEEDS {
            if self.start <= seed.first && seed.last <= self.stop {
                if self.flags & Self::CALLBACK_FLAGS != 0 {
                    if seed.arity_index == 0 {
                        match callback {
                            Some(PrimeCallback::U32(f)) => f(seed.first as u32),
                            Some(PrimeCallback::U64(f)) => f(seed.first),
                            None => {}
                        }
                    }
                } else {
                    if self.flags & (Self::COUNT_PRIMES << seed.arity_index) != 0 {
                        self.counts[seed.arity_index] += 1;
                    }
                    if self.flags & (Self::PRINT_PRIMES << seed.arity_index) != 0 {
                        println!("{}", seed.text);
                    }
                }
            }
        }
    }

    /// Counts the primes within `[start, stop]`.
    pub fn count_primes(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_PRIMES, 0)
    }

    /// Counts the twin primes within `[start, stop]`.
    pub fn count_twins(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_TWINS, 1)
    }

    /// Counts the prime triplets within `[start, stop]`.
    pub fn count_triplets(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_TRIPLETS, 2)
    }

    /// Counts the prime quadruplets within `[start, stop]`.
    pub fn count_quadruplets(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_QUADRUPLETS, 3)
    }

    /// Counts the prime quintuplets within `[start, stop]`.
    pub fn count_quintuplets(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_QUINTUPLETS, 4)
    }

    /// Counts the prime sextuplets within `[start, stop]`.
    pub fn count_sextuplets(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_SEXTUPLETS, 5)
    }

    /// Counts the prime septuplets within `[start, stop]`.
    pub fn count_septuplets(&mut self, start: u64, stop: u64) -> Result<u64, Error> {
        self.count_kind(start, stop, Self::COUNT_SEPTUPLETS, 6)
    }

    fn count_kind(&mut self, start: u64, stop: u64, flag: u32, index: usize) -> Result<u64, Error> {
        self.set_flags(flag)?;
        self.sieve_interval(start, stop)?;
        Ok(self.counts[index])
    }

    /// Prints the primes within `[start, stop]` to stdout, one per line.
    pub fn print_primes(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_PRIMES)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the twin primes within `[start, stop]` to stdout.
    pub fn print_twins(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_TWINS)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the prime triplets within `[start, stop]` to stdout.
    pub fn print_triplets(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_TRIPLETS)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the prime quadruplets within `[start, stop]` to stdout.
    pub fn print_quadruplets(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_QUADRUPLETS)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the prime quintuplets within `[start, stop]` to stdout.
    pub fn print_quintuplets(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_QUINTUPLETS)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the prime sextuplets within `[start, stop]` to stdout.
    pub fn print_sextuplets(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_SEXTUPLETS)?;
        self.sieve_interval(start, stop)
    }

    /// Prints the prime septuplets within `[start, stop]` to stdout.
    pub fn print_septuplets(&mut self, start: u64, stop: u64) -> Result<(), Error> {
        self.set_flags(Self::PRINT_SEPTUPLETS)?;
        self.sieve_interval(start, stop)
    }

    /// Calls `f` once for every prime within `[start, stop]`, in ascending
    /// order. Lowers the pre-sieve limit to its minimum to shorten
    /// start-up for small intervals.
    pub fn generate_primes(
        &mut self,
        start: u64,
        stop: u64,
        mut f: impl FnMut(u64),
    ) -> Result<(), Error> {
        self.set_start(start)?;
        self.set_stop(stop)?;
        self.flags = Self::CALLBACK64_PRIMES;
        self.set_pre_sieve_limit(13);
        self.sieve_with(Some(PrimeCallback::U64(&mut f)))
    }

    /// `generate_primes` for intervals within u32.
    pub fn generate_primes_u32(
        &mut self,
        start: u32,
        stop: u32,
        mut f: impl FnMut(u32),
    ) -> Result<(), Error> {
        self.set_start(start as u64)?;
        self.set_stop(stop as u64)?;
        self.flags = Self::CALLBACK32_PRIMES;
        self.set_pre_sieve_limit(13);
        self.sieve_with(Some(PrimeCallback::U32(&mut f)))
    }

    /// The n-th prime, 1-based: `nth_prime(1) == 2`. Returns 0 for n = 0.
    pub fn nth_prime(&mut self, n: u64) -> Result<u64, Error> {
        // p_n < n (ln n + ln ln n) for n >= 6 (Rosser)
        let bound = if n < 6 {
            11
        } else {
            let nf = n as f64;
            (nf * (nf.ln() + nf.ln().ln())).ceil() as u64 + 1
        };
        let mut seen = 0u64;
        let mut nth = 0u64;
        self.generate_primes(0, bound, |p| {
            seen += 1;
            if seen == n {
                nth = p;
            }
        })?;
        Ok(nth)
    }
}

impl Default for PrimeSieve {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_prime_counts() {
        let mut ps = PrimeSieve::new();
        assert_eq!(ps.count_primes(0, 100).unwrap(), 25);
        assert_eq!(ps.count_primes(0, 1_000).unwrap(), 168);
        assert_eq!(ps.count_primes(0, 10_000).unwrap(), 1_229);
        assert_eq!(ps.count_primes(0, 100_000).unwrap(), 9_592);
        assert_eq!(ps.count_primes(0, 1_000_000).unwrap(), 78_498);
    }

    #[test]
    fn interval_counts_split() {
        let mut ps = PrimeSieve::new();
        assert_eq!(ps.count_primes(0, 2_000_000).unwrap(), 148_933);
        // pi(2*10^6) - pi(10^6)
        assert_eq!(ps.count_primes(1_000_001, 2_000_000).unwrap(), 70_435);
    }

    #[test]
    fn tiny_intervals() {
        let mut ps = PrimeSieve::new();
        assert_eq!(ps.count_primes(2, 2).unwrap(), 1);
        assert_eq!(ps.count_primes(3, 5).unwrap(), 2);
        assert_eq!(ps.count_primes(4, 4).unwrap(), 0);
        assert_eq!(ps.count_primes(7, 7).unwrap(), 1);
        assert_eq!(ps.count_primes(8, 10).unwrap(), 0);
        assert_eq!(ps.count_primes(0, 1).unwrap(), 0);
    }

    #[test]
    fn start_zero_and_one_agree() {
        let mut ps = PrimeSieve::new();
        let from_zero = ps.count_primes(0, 10_000).unwrap();
        let from_one = ps.count_primes(1, 10_000).unwrap();
        assert_eq!(from_zero, from_one);
    }

    #[test]
    fn known_tuplet_counts() {
        let mut ps = PrimeSieve::new();
        // (3,5) (5,7) (11,13) (17,19) (29,31) (41,43) (59,61) (71,73)
        assert_eq!(ps.count_twins(0, 100).unwrap(), 8);
        assert_eq!(ps.count_twins(0, 1_000).unwrap(), 35);
        // triplets starting at 5, 7, 11, 13, 17, 37, 41, 67
        assert_eq!(ps.count_triplets(0, 100).unwrap(), 8);
        // quadruplets starting at 5, 11; (101,...) exceeds 100
        assert_eq!(ps.count_quadruplets(0, 100).unwrap(), 2);
        // quadruplets starting at 5, 11, 101, 191, 821
        assert_eq!(ps.count_quadruplets(0, 1_000).unwrap(), 5);
        // quintuplets starting at 5, 7, 11
        assert_eq!(ps.count_quintuplets(0, 100).unwrap(), 3);
        // quintuplets starting at 5, 7, 11, 97, 101
        assert_eq!(ps.count_quintuplets(0, 1_000).unwrap(), 5);
        // the sextuplet (7, 11, 13, 17, 19, 23)
        assert_eq!(ps.count_sextuplets(0, 100).unwrap(), 1);
        // sextuplets starting at 7 and 97
        assert_eq!(ps.count_sextuplets(0, 10_000).unwrap(), 2);
        // the septuplet (11, 13, 17, 19, 23, 29, 31)
        assert_eq!(ps.count_septuplets(0, 100_000).unwrap(), 1);
    }

    #[test]
    fn tuplets_straddling_stop_are_not_counted() {
        let mut ps = PrimeSieve::new();
        // twin (29, 31): only complete once stop reaches 31
        assert_eq!(ps.count_twins(8, 30).unwrap(), 2);
        assert_eq!(ps.count_twins(8, 31).unwrap(), 3);
        // a tuplet belongs to the interval holding its smallest member
        assert_eq!(ps.count_twins(30, 100).unwrap(), 3);
        assert_eq!(ps.count_twins(29, 100).unwrap(), 4);
    }

    #[test]
    fn callback_sequence() {
        let mut ps = PrimeSieve::new();
        let mut seen = Vec::new();
        ps.generate_primes(0, 30, |p| seen.push(p)).unwrap();
        assert_eq!(seen, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);

        let mut seen32 = Vec::new();
        ps.generate_primes_u32(0, 30, |p| seen32.push(p)).unwrap();
        assert_eq!(seen32, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn callbacks_are_idempotent_and_ordered() {
        let mut ps = PrimeSieve::new();
        let mut first = Vec::new();
        ps.generate_primes(500, 10_000, |p| first.push(p)).unwrap();
        let mut second = Vec::new();
        ps.generate_primes(500, 10_000, |p| second.push(p)).unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(first.len(), 1_229 - 95); // pi(10^4) - pi(500)
        assert_eq!(first[0], 503);
    }

    #[test]
    fn counts_are_reset_between_runs() {
        let mut ps = PrimeSieve::new();
        assert_eq!(ps.count_primes(0, 100).unwrap(), 25);
        assert_eq!(ps.count_primes(0, 100).unwrap(), 25);
        // counting twins clears the prime count
        ps.count_twins(0, 100).unwrap();
        assert_eq!(ps.prime_count(), 0);
        assert_eq!(ps.twin_count(), 8);
    }

    #[test]
    fn several_counters_in_one_run() {
        let mut ps = PrimeSieve::new();
        ps.set_flags(
            PrimeSieve::COUNT_PRIMES | PrimeSieve::COUNT_TWINS | PrimeSieve::COUNT_TRIPLETS,
        )
        .unwrap();
        ps.sieve_interval(0, 1_000).unwrap();
        assert_eq!(ps.prime_count(), 168);
        assert_eq!(ps.twin_count(), 35);
        assert_eq!(ps.count(0).unwrap(), 168);
        assert!(matches!(ps.count(7), Err(Error::CountIndex(7))));
    }

    #[test]
    fn sieve_size_invariance() {
        let mut reference = PrimeSieve::new();
        reference.set_sieve_size(256);
        let expected = reference.count_primes(900_000, 1_200_000).unwrap();
        for kilobytes in [1, 4, 64] {
            let mut ps = PrimeSieve::new();
            ps.set_sieve_size(kilobytes);
            assert_eq!(ps.count_primes(900_000, 1_200_000).unwrap(), expected);
        }
    }

    #[test]
    fn pre_sieve_invariance() {
        for limit in [13, 17, 23] {
            let mut ps = PrimeSieve::new();
            ps.set_pre_sieve_limit(limit);
            assert_eq!(ps.count_primes(0, 100_000).unwrap(), 9_592);
            assert_eq!(ps.count_twins(0, 1_000).unwrap(), 35);
        }
    }

    /// A one kilobyte segment pushes the primes above 5120 into the
    /// bucketed tier once sqrt(stop) exceeds it.
    #[test]
    fn small_segments_agree_with_large() {
        let mut small = PrimeSieve::new();
        small.set_sieve_size(1);
        let mut large = PrimeSieve::new();
        large.set_sieve_size(512);
        let a = small.count_primes(0, 40_000_000).unwrap();
        let b = large.count_primes(0, 40_000_000).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 2_433_654); // pi(4*10^7)
    }

    #[test]
    fn configuration_is_clamped() {
        let mut ps = PrimeSieve::new();
        ps.set_sieve_size(0);
        assert_eq!(ps.sieve_size(), 1);
        ps.set_sieve_size(100);
        assert_eq!(ps.sieve_size(), 128);
        ps.set_sieve_size(10_000);
        assert_eq!(ps.sieve_size(), 4096);
        ps.set_pre_sieve_limit(2);
        assert_eq!(ps.pre_sieve_limit(), 13);
        ps.set_pre_sieve_limit(100);
        assert_eq!(ps.pre_sieve_limit(), 23);
    }

    #[test]
    fn bounds_are_validated() {
        let mut ps = PrimeSieve::new();
        assert!(ps.set_stop(MAX_STOP).is_ok());
        assert!(matches!(ps.set_stop(MAX_STOP + 1), Err(Error::BoundTooLarge(_))));
        assert!(matches!(ps.set_start(u64::MAX), Err(Error::BoundTooLarge(_))));
        assert!(matches!(
            ps.count_primes(100, 10),
            Err(Error::StopBeforeStart { start: 100, stop: 10 })
        ));
        assert!(matches!(ps.set_flags(1 << 20), Err(Error::InvalidFlags(_))));
        assert!(ps.set_flags((1 << 20) - 1).is_ok());
    }

    #[test]
    fn nth_prime_values() {
        let mut ps = PrimeSieve::new();
        assert_eq!(ps.nth_prime(1).unwrap(), 2);
        assert_eq!(ps.nth_prime(6).unwrap(), 13);
        assert_eq!(ps.nth_prime(25).unwrap(), 97);
        assert_eq!(ps.nth_prime(10_000).unwrap(), 104_729);
    }

    #[test]
    fn status_reaches_completion() {
        let mut ps = PrimeSieve::new();
        ps.count_primes(0, 100_000).unwrap();
        assert_eq!(ps.status(), 100.0);
        assert!(ps.seconds() >= 0.0);
    }

    /// Sieving at the upper end of the supported range must not overflow.
    /// Slow (sqrt(stop) is near 2^32), hence ignored by default.
    #[test]
    #[ignore]
    fn sieve_near_max_stop() {
        let mut ps = PrimeSieve::new();
        let count = ps.count_primes(MAX_STOP - 10_000, MAX_STOP).unwrap();
        assert!(count > 0);
    }
}
