//! The segmented sieve engine.
//!
//! [`SegmentedSieve`] owns the segment buffer, the pre-sieve pattern and the
//! three cross-off tiers. It is driven by feeding it every sieving prime in
//! `(pre_sieve_limit, sqrt(stop)]` in ascending order via [`sieve`], then
//! calling [`finish`]. Segments are processed left to right; a segment is
//! sieved as soon as every prime that can contribute to it has arrived,
//! i.e. while `segment_high < prime^2` holds for the incoming prime. After
//! each segment the [`SegmentSink`] is handed the finished bytes, with the
//! bits outside `[start, stop]` already cleared.
//!
//! [`sieve`]: SegmentedSieve::sieve
//! [`finish`]: SegmentedSieve::finish

use num_integer::Roots;

use crate::erat_big::EratBig;
use crate::erat_medium::EratMedium;
use crate::erat_small::EratSmall;
use crate::presieve::{PreSieve, WHEEL_PRIMES};
use crate::wheel::{RESIDUES, WHEEL_CLASS};

/// Consumer of finished segments. The engine invokes it exactly once per
/// segment, in ascending segment order.
pub(crate) trait SegmentSink {
    fn segment_processed(&mut self, sieve: &[u8], segment_low: u64);
}

/// Primes below this share of the segment size use the unrolled cross-off.
const SMALL_FACTOR_NUM: u64 = 3;
const SMALL_FACTOR_DEN: u64 = 4;
/// Primes up to this multiple of the segment size keep per-prime state in
/// EratMedium; beyond it the bucketed EratBig takes over. The factor keeps
/// a medium prime's packed multiple index within its 23 bits at the largest
/// permitted segment.
const MEDIUM_FACTOR: u64 = 5;

pub(crate) struct SegmentedSieve<S: SegmentSink> {
    pub(crate) sink: S,
    start: u64,
    stop: u64,
    sqrt_stop: u64,
    segment_low: u64,
    segment_high: u64,
    span: u64,
    sieve: Vec<u8>,
    limit_small: u64,
    limit_medium: u64,
    pre: PreSieve,
    small: EratSmall,
    medium: EratMedium,
    big: EratBig,
    first_segment: bool,
    finished: bool,
    #[cfg(debug_assertions)]
    last_prime: u64,
}

impl<S: SegmentSink> SegmentedSieve<S> {
    /// `start` must be at least 7 and not exceed `stop`; `sieve_bytes` must
    /// be a power of two. The first segment is aligned so that `start`
    /// falls into its first byte.
    pub fn new(start: u64, stop: u64, sieve_bytes: usize, pre_sieve_limit: u32, sink: S) -> Self {
        debug_assert!(start >= 7 && start <= stop);
        debug_assert!(sieve_bytes.is_power_of_two());
        let sqrt_stop = stop.sqrt();
        let mut remainder = start % 30;
        if remainder <= 6 {
            remainder += 30;
        }
        let segment_low = start - remainder;
        let span = 30 * sieve_bytes as u64;
        SegmentedSieve {
            sink,
            start,
            stop,
            sqrt_stop,
            segment_low,
            segment_high: segment_low + span + 1,
            span,
            sieve: vec![0; sieve_bytes],
            limit_small: sieve_bytes as u64 * SMALL_FACTOR_NUM / SMALL_FACTOR_DEN,
            limit_medium: sieve_bytes as u64 * MEDIUM_FACTOR,
            pre: PreSieve::new(pre_sieve_limit),
            small: EratSmall::new(),
            medium: EratMedium::new(),
            big: EratBig::new(stop, sieve_bytes, segment_low, sqrt_stop),
            first_segment: true,
            finished: false,
            #[cfg(debug_assertions)]
            last_prime: 0,
        }
    }

    pub fn sqrt_stop(&self) -> u64 {
        self.sqrt_stop
    }

    pub fn pre_sieve_limit(&self) -> u32 {
        self.pre.limit()
    }

    /// Registers one sieving prime. Primes must arrive in ascending order,
    /// all within `(pre_sieve_limit, sqrt(stop)]`.
    pub fn sieve(&mut self, prime: u64) {
        debug_assert!(prime > self.pre.limit() as u64);
        debug_assert!(prime <= self.sqrt_stop);
        #[cfg(debug_assertions)]
        {
            debug_assert!(prime > self.last_prime, "primes must be fed in ascending order");
            self.last_prime = prime;
        }
        // every segment below prime^2 has received all the primes it
        // needs; sieve those segments before registering this prime
        let square = prime * prime;
        while self.segment_high < square {
            self.sieve_segment();
        }
        if prime <= self.limit_small {
            self.small.add(prime, self.segment_low, self.stop);
        } else if prime <= self.limit_medium {
            self.medium.add(prime, self.segment_low, self.stop);
        } else {
            self.big.add(prime, self.segment_low, self.stop);
        }
    }

    /// Sieves all remaining segments up to `stop`. Idempotent.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        while self.segment_high < self.stop {
            self.sieve_segment();
        }
        // the last, possibly partial segment
        if self.stop >= self.segment_low + 7 {
            self.prepare_segment();
            self.cross_off();
            let length = ((self.stop - self.segment_low - 6) / 30 + 1) as usize;
            let last_byte = self.segment_low + 30 * (length as u64 - 1);
            for (i, &r) in RESIDUES.iter().enumerate() {
                if last_byte + r > self.stop {
                    self.sieve[length - 1] &= !(1u8 << i);
                }
            }
            self.sink.segment_processed(&self.sieve[..length], self.segment_low);
        }
    }

    fn sieve_segment(&mut self) {
        self.prepare_segment();
        self.cross_off();
        self.sink.segment_processed(&self.sieve, self.segment_low);
        self.segment_low += self.span;
        self.segment_high += self.span;
    }

    /// Tiles the pre-sieve pattern into the segment and repairs the edges:
    /// the pattern marks the pre-sieved primes themselves as composite, and
    /// the first segment may reach below `start`.
    fn prepare_segment(&mut self) {
        self.pre.copy_into(&mut self.sieve, self.segment_low);
        if self.segment_low == 0 {
            let limit = self.pre.limit() as u64;
            for &p in WHEEL_PRIMES.iter().take_while(move |&&p| p <= limit) {
                self.sieve[0] |= 1u8 << WHEEL_CLASS[(p % 30) as usize];
            }
        }
        if self.first_segment {
            self.first_segment = false;
            for (i, &r) in RESIDUES.iter().enumerate() {
                if self.segment_low + r < self.start {
                    self.sieve[0] &= !(1u8 << i);
                }
            }
        }
    }

    fn cross_off(&mut self) {
        self.small.cross_off(&mut self.sieve);
        self.medium.cross_off(&mut self.sieve);
        self.big.cross_off(&mut self.sieve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheel::for_each_set_bit;

    struct Collect {
        primes: Vec<u64>,
    }

    impl SegmentSink for Collect {
        fn segment_processed(&mut self, sieve: &[u8], segment_low: u64) {
            for_each_set_bit(sieve, segment_low, &mut |p| self.primes.push(p));
        }
    }

    fn trial_primes(low: u64, high: u64) -> Vec<u64> {
        (low.max(2)..=high)
            .filter(|&n| {
                let mut d = 2;
                while d * d <= n {
                    if n % d == 0 {
                        return false;
                    }
                    d += 1;
                }
                true
            })
            .collect()
    }

    fn run(start: u64, stop: u64, sieve_bytes: usize) -> Vec<u64> {
        let mut engine =
            SegmentedSieve::new(start.max(7), stop, sieve_bytes, 13, Collect { primes: Vec::new() });
        for p in trial_primes(14, engine.sqrt_stop()) {
            engine.sieve(p);
        }
        engine.finish();
        engine.sink.primes
    }

    #[test]
    fn engine_reproduces_trial_division() {
        // spans several segments at 256 bytes (7680 numbers per segment)
        assert_eq!(run(7, 50_000, 256), trial_primes(7, 50_000));
    }

    #[test]
    fn interval_edges_are_trimmed() {
        assert_eq!(run(1000, 1100, 1024), trial_primes(1000, 1100));
        // start and stop both prime
        assert_eq!(run(1009, 1093, 1024), trial_primes(1009, 1093));
        // stop aligned on a wheel residue
        assert_eq!(run(7, 991, 1024), trial_primes(7, 991));
    }

    #[test]
    fn tiny_trailing_segment_has_no_candidates() {
        // stop falls in the 2..=6 gap after a segment boundary
        let span = 30 * 1024u64;
        let stop = span + 3;
        assert_eq!(run(7, stop, 1024), trial_primes(7, stop));
    }

    #[test]
    fn sieve_size_invariance() {
        let reference = run(7, 200_000, 4096);
        for bytes in [1024, 2048, 16384] {
            assert_eq!(run(7, 200_000, bytes), reference);
        }
    }
}
