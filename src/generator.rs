//! Generation of the sieving primes needed by an outer sieve.
//!
//! The finder over `[start, stop]` needs every prime in
//! `(pre_sieve_limit, sqrt(stop)]`. Those are produced by a second,
//! smaller [`SegmentedSieve`] whose segments fit the L1 cache: each of its
//! finished segments is decoded bit by bit and the primes are fed straight
//! into the outer engine, which interleaves its own segment processing with
//! the feed. The generator's own sieving primes (up to `stop^(1/4)`) come
//! from the driver's one-shot flat bootstrap sieve; the recursion is
//! exactly two levels deep.

use crate::engine::{SegmentSink, SegmentedSieve};
use crate::finder::PrimeFinder;
use crate::wheel::for_each_set_bit;

/// L1-sized segments; the generator's range is tiny next to the finder's.
const GENERATOR_SIEVE_BYTES: usize = 32 * 1024;
const GENERATOR_PRE_SIEVE: u32 = 13;

pub(crate) struct PrimeGenerator<'f, 'a> {
    engine: SegmentedSieve<GeneratorSink<'f, 'a>>,
}

impl<'f, 'a> PrimeGenerator<'f, 'a> {
    /// Sieves `(finder.pre_sieve_limit(), sqrt(finder stop)]` and feeds
    /// every prime found into `finder`.
    pub fn new(finder: &'f mut PrimeFinder<'a>) -> Self {
        let start = finder.pre_sieve_limit() as u64 + 1;
        let stop = finder.sqrt_stop();
        debug_assert!(start <= stop);
        PrimeGenerator {
            engine: SegmentedSieve::new(
                start,
                stop,
                GENERATOR_SIEVE_BYTES,
                GENERATOR_PRE_SIEVE,
                GeneratorSink { finder },
            ),
        }
    }

    /// Upper bound of the bootstrap primes this generator needs, i.e. the
    /// fourth root of the outer stop.
    pub fn sqrt_stop(&self) -> u64 {
        self.engine.sqrt_stop()
    }

    pub fn pre_sieve_limit(&self) -> u32 {
        self.engine.pre_sieve_limit()
    }

    pub fn sieve(&mut self, prime: u64) {
        self.engine.sieve(prime);
    }

    pub fn finish(&mut self) {
        self.engine.finish();
    }
}

struct GeneratorSink<'f, 'a> {
    finder: &'f mut PrimeFinder<'a>,
}

impl SegmentSink for GeneratorSink<'_, '_> {
    fn segment_processed(&mut self, sieve: &[u8], segment_low: u64) {
        let finder = &mut *self.finder;
        for_each_set_bit(sieve, segment_low, &mut |prime| finder.sieve(prime));
    }
}
