//! RNG oracle for deterministic random number generation.
//!
//! Pattern selection and random-mode ability picks draw from a
//! [`RandomStream`], which derives one seed per draw from the encounter seed
//! and a draw counter. Given the same seed and the same sequence of calls, a
//! fight makes the same choices, which keeps encounters replayable and tests
//! reproducible.

/// RNG oracle for deterministic random number generation.
///
/// Implementations must be deterministic and produce the same values
/// given the same seed.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Generate a value in `[0, 1)` from a seed.
    fn next_unit(&self, seed: u64) -> f32 {
        // 24 bits fit an f32 mantissa exactly, so 1.0 is never produced.
        (self.next_u32(seed) >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Generate an index in `[0, len)`. `len` must be non-zero.
    fn index(&self, seed: u64, len: usize) -> usize {
        ((u64::from(self.next_u32(seed)) * len as u64) >> 32) as usize
    }
}

/// PCG random number generator (Permuted Congruential Generator).
///
/// Uses the PCG-XSH-RR variant: 64-bit state, 32-bit output.
///
/// # References
///
/// - PCG paper: <https://www.pcg-random.org/>
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR output permutation.
    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::pcg_output(Self::pcg_step(seed))
    }
}

/// Compute a deterministic per-draw seed.
///
/// # Arguments
///
/// * `encounter_seed` - Base seed from the encounter configuration
/// * `nonce` - Draw counter (increments on every draw)
/// * `context` - Distinguishes independent uses of the same stream
pub fn compute_seed(encounter_seed: u64, nonce: u64, context: u32) -> u64 {
    // SplitMix64 / FxHash style mixing followed by a murmur avalanche.
    let mut hash = encounter_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= u64::from(context).wrapping_mul(0x85ebca6b);

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ceb9fe1a85ec53);
    hash ^= hash >> 33;

    hash
}

/// Stateful draw sequence over an [`RngOracle`].
pub struct RandomStream {
    oracle: Box<dyn RngOracle>,
    seed: u64,
    nonce: u64,
}

impl RandomStream {
    /// Context for weighted pattern selection.
    pub const PATTERN_SELECTION: u32 = 0;
    /// Context for random-mode ability picks.
    pub const ABILITY_PICK: u32 = 1;

    pub fn new(seed: u64) -> Self {
        Self::with_oracle(seed, Box::new(PcgRng))
    }

    pub fn with_oracle(seed: u64, oracle: Box<dyn RngOracle>) -> Self {
        Self {
            oracle,
            seed,
            nonce: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> u64 {
        self.nonce
    }

    /// Draws a value in `[0, 1)`.
    pub fn next_unit(&mut self, context: u32) -> f32 {
        let seed = self.advance(context);
        self.oracle.next_unit(seed)
    }

    /// Draws an index in `[0, len)`, or `None` for an empty range.
    pub fn pick_index(&mut self, len: usize, context: u32) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let seed = self.advance(context);
        Some(self.oracle.index(seed, len))
    }

    fn advance(&mut self, context: u32) -> u64 {
        let seed = compute_seed(self.seed, self.nonce, context);
        self.nonce += 1;
        seed
    }
}

impl std::fmt::Debug for RandomStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomStream")
            .field("seed", &self.seed)
            .field("nonce", &self.nonce)
            .finish()
    }
}
