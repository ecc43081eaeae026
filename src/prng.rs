//! Deterministic pseudo-random number generator for the simulation.
//!
//! Two independent 16/16-split linear congruential generators combined into
//! one 32-bit output. Demo playback re-seeds this generator per tick from
//! recorded state, so every method must produce identical output for
//! identical prior state on every platform. No floating point, no stdlib
//! RNG, no other source of non-determinism in this module.

/// Dual-state 16/16 LCG.
///
/// Each half advances as `x = 36969 * (x & 0xFFFF) + (x >> 16)`; the output
/// is `(v << 16) + u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg16 {
    u: u32,
    v: u32,
}

impl Lcg16 {
    /// Create a generator from a single seed word.
    pub fn new(seed: u32) -> Self {
        let mut rng = Self { u: 0, v: 0 };
        rng.seed(seed);
        rng
    }

    /// Re-seed from a single word. The two halves are derived so distinct
    /// seeds diverge immediately.
    pub fn seed(&mut self, seed: u32) {
        self.u = seed.wrapping_mul(2) ^ 0x9E37;
        self.v = seed ^ 0x79B9;
        if self.u == 0 {
            self.u = 1;
        }
        if self.v == 0 {
            self.v = 1;
        }
    }

    /// Re-seed both halves exactly. Used by demo playback to resynchronize
    /// mid-stream with a recorded generator state.
    pub fn seed2(&mut self, u: u32, v: u32) {
        self.u = if u == 0 { 1 } else { u };
        self.v = if v == 0 { 1 } else { v };
    }

    /// Current raw state, recorded into demo files.
    pub fn state(&self) -> (u32, u32) {
        (self.u, self.v)
    }

    /// Next value in the stream.
    pub fn next(&mut self) -> u32 {
        self.u = 36969u32
            .wrapping_mul(self.u & 0xFFFF)
            .wrapping_add(self.u >> 16);
        self.v = 36969u32
            .wrapping_mul(self.v & 0xFFFF)
            .wrapping_add(self.v >> 16);
        (self.v << 16).wrapping_add(self.u)
    }

    /// Uniform value in `[lo, hi]` (inclusive). Modulo bias is acceptable
    /// for gameplay ranges, which are tiny against 2^32.
    pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as u32;
        lo + (self.next() % span) as i32
    }

    /// Percent-chance roll: true `p` times out of 100.
    pub fn percent(&mut self, p: u32) -> bool {
        (self.next() % 100) < p
    }

    /// Fair coin.
    pub fn coin(&mut self) -> bool {
        self.next() & 1 == 1
    }

    /// Fisher-Yates shuffle driven by this generator.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

/// The two random streams a session carries.
///
/// `level` drives terrain generation and enemy trigger decisions and is the
/// stream demo recordings capture. `ambient` drives purely cosmetic
/// randomness (explosion speckle, menu flourishes) and must never be asked
/// for a gameplay decision, or demo playback diverges.
#[derive(Debug, Clone)]
pub struct RngPair {
    pub level: Lcg16,
    pub ambient: Lcg16,
}

impl RngPair {
    pub fn new(level_seed: u32, ambient_seed: u32) -> Self {
        Self {
            level: Lcg16::new(level_seed),
            ambient: Lcg16::new(ambient_seed),
        }
    }
}
