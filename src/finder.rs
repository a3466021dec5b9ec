//! Extraction of results from finished segments.
//!
//! [`PrimeFinder`] wraps the engine over the user's `[start, stop]`
//! interval and dispatches every finished segment according to the active
//! flags: popcount for prime counting, per-byte residue bitmasks for the
//! k-tuplet counts, bit decoding for printing and callbacks.
//!
//! Every admissible k-tuplet pattern (k >= 2) falls inside a single
//! 30-number window, so each arity is a short list of byte masks; a byte
//! matches a mask when all of the mask's bits survived the sieve. Counting
//! goes through a per-arity table of match counts for all 256 byte values.

use std::sync::Arc;

use crate::driver::{PrimeSieve, SieveStatus};
use crate::engine::{SegmentSink, SegmentedSieve};
use crate::wheel::{for_each_set_bit, RESIDUES};

/// Per-arity residue bitmasks of the prime k-tuplets, twins first.
/// E.g. 0x06 is the twin (11, 13) mod 30, 0xC0 the twin (29, 31) mod 30.
const TUPLET_MASKS: [&[u8]; 6] = [
    &[0x06, 0x18, 0xC0],       // twins
    &[0x07, 0x0E, 0x1C, 0x38], // triplets
    &[0x1E],                   // quadruplets
    &[0x1F, 0x3E],             // quintuplets
    &[0x3F],                   // sextuplets
    &[0xFE],                   // septuplets
];

/// A prime consumer handed to `generate_primes`; the 32-bit variant exists
/// for callers that know their interval fits u32.
pub(crate) enum PrimeCallback<'a> {
    U32(&'a mut dyn FnMut(u32)),
    U64(&'a mut dyn FnMut(u64)),
}

pub(crate) struct PrimeFinder<'a> {
    engine: SegmentedSieve<FinderSink<'a>>,
}

impl<'a> PrimeFinder<'a> {
    pub fn new(
        start: u64,
        stop: u64,
        sieve_bytes: usize,
        pre_sieve_limit: u32,
        flags: u32,
        callback: Option<PrimeCallback<'a>>,
        status: Arc<SieveStatus>,
    ) -> Self {
        let sink = FinderSink {
            flags,
            counts: [0; 7],
            tuplet_counts: if flags & PrimeSieve::COUNT_TUPLET_FLAGS != 0 {
                Some(build_count_tables())
            } else {
                None
            },
            callback,
            status,
        };
        PrimeFinder {
            engine: SegmentedSieve::new(start.max(7), stop, sieve_bytes, pre_sieve_limit, sink),
        }
    }

    /// The engine needs sieving primes only if composites remain that the
    /// pre-sieve pattern does not already cover.
    pub fn need_generator(&self) -> bool {
        self.engine.sqrt_stop() > self.engine.pre_sieve_limit() as u64
    }

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

    pub fn counts(&self) -> &[u64; 7] {
        &self.engine.sink.counts
    }
}

struct FinderSink<'a> {
    flags: u32,
    counts: [u64; 7],
    tuplet_counts: Option<Box<[[u8; 256]; 6]>>,
    callback: Option<PrimeCallback<'a>>,
    status: Arc<SieveStatus>,
}

impl SegmentSink for FinderSink<'_> {
    fn segment_processed(&mut self, sieve: &[u8], segment_low: u64) {
        if self.flags & PrimeSieve::COUNT_PRIMES != 0 {
            self.counts[0] += count_bits(sieve);
        }
        if let Some(tables) = &self.tuplet_counts {
            for k in 1..7 {
                if self.flags & (PrimeSieve::COUNT_PRIMES << k) != 0 {
                    let table = &tables[k - 1];
                    self.counts[k] += sieve.iter().map(|&b| table[b as usize] as u64).sum::<u64>();
                }
            }
        }
        if self.flags & PrimeSieve::PRINT_PRIMES != 0 {
            for_each_set_bit(sieve, segment_low, &mut |p| println!("{}", p));
        }
        for k in 1..7 {
            if self.flags & (PrimeSieve::PRINT_PRIMES << k) != 0 {
                print_tuplets(sieve, segment_low, k);
            }
        }
        match &mut self.callback {
            Some(PrimeCallback::U64(f)) => for_each_set_bit(sieve, segment_low, &mut |p| f(p)),
            Some(PrimeCallback::U32(f)) => {
                for_each_set_bit(sieve, segment_low, &mut |p| f(p as u32))
            }
            None => {}
        }
        self.status.advance(30 * sieve.len() as u64);
    }
}

/// Number of set bits, read as little-endian u64 words.
fn count_bits(sieve: &[u8]) -> u64 {
    let chunks = sieve.chunks_exact(8);
    let tail: u64 = chunks
        .remainder()
        .iter()
        .map(|b| b.count_ones() as u64)
        .sum();
    chunks
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()).count_ones() as u64)
        .sum::<u64>()
        + tail
}

/// For each arity, how many tuplet patterns a given byte value completes.
fn build_count_tables() -> Box<[[u8; 256]; 6]> {
    let mut tables = Box::new([[0u8; 256]; 6]);
    for (k, masks) in TUPLET_MASKS.iter().enumerate() {
        for byte in 0..256 {
            tables[k][byte] = masks
                .iter()
                .filter(|&&m| byte as u8 & m == m)
                .count() as u8;
        }
    }
    tables
}

fn print_tuplets(sieve: &[u8], segment_low: u64, k: usize) {
    for (byte, &bits) in sieve.iter().enumerate() {
        for &mask in TUPLET_MASKS[k - 1] {
            if bits & mask == mask {
                let base = segment_low + 30 * byte as u64;
                let mut text = String::from("(");
                let mut rest = mask;
                while rest != 0 {
                    let i = rest.trailing_zeros() as usize;
                    if text.len() > 1 {
                        text.push_str(", ");
                    }
                    text.push_str(&(base + RESIDUES[i]).to_string());
                    rest &= rest - 1;
                }
                text.push(')');
                println!("{}", text);
            }
        }
    }
}
