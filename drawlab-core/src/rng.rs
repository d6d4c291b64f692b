//! Deterministic ticket RNG.
//!
//! Every backtest, tuning configuration and forecast draws its tickets from a
//! single linear congruential stream seeded with a `u32`. The recurrence is
//! fixed (`state = 1664525 * state + 1013904223 mod 2^32`), so a seed
//! reproduces the same tickets bit-for-bit on every platform.

pub const LCG_MULTIPLIER: u32 = 1_664_525;
pub const LCG_INCREMENT: u32 = 1_013_904_223;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// 32-bit linear congruential generator.
///
/// `Clone` snapshots the stream: the clone continues from the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

/// Seed for one tuning configuration: the run's base seed plus its offset.
pub fn offset_seed(base: u32, offset: u32) -> u32 {
    base.wrapping_add(offset)
}
