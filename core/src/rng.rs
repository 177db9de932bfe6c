//! Deterministic random number generation.
//!
//! RULE: Nothing in the economy may call any platform RNG.
//! All randomness flows through HandlerRng instances derived
//! from the single master seed in the config.
//!
//! Each handler invocation gets its own stream, seeded from
//! (master_seed, phase, cycle, registration index). This means:
//!   - Registering a handler after existing ones never changes their streams.
//!   - A given cycle can be replayed in isolation from a snapshot.

use crate::{phase::SettlementPhase, types::Cycle};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// A named, deterministic RNG for a single handler invocation.
pub struct HandlerRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl HandlerRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform integer in [min, max]. Returns `min` when the range is empty.
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min) as u64 + 1;
        min + self.next_u64_below(span) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Hands out per-invocation RNG streams for one session.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_handler(&self, phase: SettlementPhase, cycle: Cycle, registration: usize) -> HandlerRng {
        let derived = self.master_seed
            ^ (phase.index() as u64 + 1).wrapping_mul(GOLDEN)
            ^ cycle.wrapping_mul(GOLDEN.rotate_left(17))
            ^ (registration as u64 + 1).wrapping_mul(GOLDEN.rotate_left(31));
        HandlerRng::from_seed(derived).with_name(phase.name())
    }
}
