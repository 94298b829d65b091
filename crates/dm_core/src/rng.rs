// crates/dm_core/src/rng.rs
//
// Deterministic RNG for the samplers: edge/vertex picks, orientation coins,
// Metropolis acceptance draws, and configuration shuffles.
//
// • One explicit u64 seed fully determines a run; the mapping to the ChaCha20
//   key is fixed (little-endian seed bytes in key[0..8], the rest zero).
// • Unbiased ranges via rejection sampling; uniform floats from the top 53 bits.
// • A word counter makes "how far did the stream advance" observable in tests.

use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};

/// Seeded ChaCha20 stream with a 64-bit word counter.
#[derive(Debug, Clone)]
pub struct ChainRng {
    rng: ChaCha20Rng,
    words_consumed: u128,
}

impl ChainRng {
    /// Construct from a 64-bit seed. `seed.to_le_bytes()` fills the first 8
    /// key bytes; the remaining 24 bytes are zero.
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            rng: ChaCha20Rng::from_seed(seed32),
            words_consumed: 0,
        }
    }

    /// Draw a fresh seed from the OS. Callers log the returned seed so the
    /// run stays reproducible.
    pub fn os_seed() -> u64 {
        OsRng.next_u64()
    }

    /// Total number of 64-bit words consumed so far (saturating).
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    /// The only place where the counter advances.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Unbiased integer in `[0, n)`; `None` if `n == 0`.
    ///
    /// `threshold = 2^64 mod n`; accept `x >= threshold`, then `x % n` is uniform.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// Uniform index in `[0, n)`; `None` if `n == 0`.
    #[inline]
    pub fn choose_index(&mut self, n: usize) -> Option<usize> {
        self.gen_range(n as u64).map(|v| v as usize)
    }

    /// Fair coin.
    #[inline]
    pub fn coin(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Uniform float in `[0, 1)` built from the top 53 bits of one word.
    #[inline]
    pub fn next_unit_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// In-place Fisher–Yates: for i in (1..len).rev() { j ~ U{0..=i}; swap(i, j) }.
    pub fn shuffle_in_place<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.choose_index(i + 1).unwrap_or(i);
            slice.swap(i, j);
        }
    }
}

impl Default for ChainRng {
    fn default() -> Self {
        Self::from_seed_u64(0)
    }
}
