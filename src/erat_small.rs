//! Cross-off of small sieving primes.
//!
//! A prime well below the segment size strikes the segment once every
//! `p / 8` bytes on average, so the work is dominated by the inner loop.
//! For each prime one full wheel turn (8 strikes, spanning exactly `p`
//! bytes) is unrolled: the byte offsets and bit masks of the 8 strikes are
//! fixed for the duration of a segment, leaving a loop of 8 masked stores
//! advancing `p` bytes per iteration. The remaining partial turn at the end
//! of the segment is walked step by step through the wheel table.

use crate::wheel::{first_multiple, reduce_prime, WheelPrime, WHEEL30};

pub(crate) struct EratSmall {
    primes: Vec<WheelPrime>,
}

impl EratSmall {
    pub fn new() -> Self {
        EratSmall { primes: Vec::new() }
    }

    /// Registers a sieving prime; its first multiple is located relative to
    /// the segment starting at `segment_low`.
    pub fn add(&mut self, prime: u64, segment_low: u64, stop: u64) {
        if let Some((index, wheel)) = first_multiple(prime, segment_low, stop) {
            self.primes
                .push(WheelPrime::new(reduce_prime(prime, wheel), index as u32, wheel));
        }
    }

    /// Clears the multiples of all registered primes within `sieve` and
    /// stores each prime's position relative to the next segment.
    pub fn cross_off(&mut self, sieve: &mut [u8]) {
        let len = sieve.len();
        for prime in &mut self.primes {
            let reduced = prime.sieving_prime() as usize;
            let mut index = prime.multiple_index() as usize;
            let mut wheel = prime.wheel_index() as usize;

            // one unrolled wheel turn starting at the current phase
            let mut offsets = [0usize; 8];
            let mut masks = [0u8; 8];
            let mut span = 0;
            let mut w = wheel;
            for k in 0..8 {
                let e = &WHEEL30[w];
                offsets[k] = span;
                masks[k] = e.unset_bit;
                span += e.factor as usize * reduced + e.correct as usize;
                w = e.next as usize;
            }
            // span == prime: every offset lies within the turn
            while index + span <= len {
                for k in 0..8 {
                    sieve[index + offsets[k]] &= masks[k];
                }
                index += span;
            }
            // partial turn at the segment end
            while index < len {
                let e = &WHEEL30[wheel];
                sieve[index] &= e.unset_bit;
                index += e.factor as usize * reduced + e.correct as usize;
                wheel = e.next as usize;
            }
            *prime = WheelPrime::new(prime.sieving_prime(), (index - len) as u32, wheel as u32);
        }
    }
}
