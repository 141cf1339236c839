//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for fast, high-quality, deterministic randomness.
//! Every peer in a room derives the same seed from the broadcast start
//! data, so every peer deals and shuffles the exact same deck.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// Given the same seed, this RNG produces the exact same sequence of
/// values on any platform, which is what makes a shared deck possible
/// without ever sending card lists over the wire.
///
/// # Example
///
/// ```
/// use rgbzet::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// let value = rng.next_u64();
/// assert_eq!(value, 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift state must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random u32.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Generate a random index in range [0, len).
    ///
    /// Returns 0 for an empty range.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large len, but acceptable
        (self.next_u64() % len as u64) as usize
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a round seed from the data broadcast at round start.
///
/// Every member of the room receives the same room code, session id and
/// player roster from the relay, so every member derives the same seed
/// and therefore the same deck. No single player can steer the shuffle.
///
/// # Parameters
///
/// - `room_code`: User-facing room code
/// - `session_id`: Unique id of this room instance
/// - `actor_ids`: All player actor ids (MUST be sorted for determinism)
pub fn derive_round_seed(
    room_code: &str,
    session_id: &[u8; 16],
    actor_ids: &[u32],
) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"RGBZET_SEED_V1");

    hasher.update(room_code.as_bytes());
    hasher.update(session_id);

    // IMPORTANT: Caller must ensure actor_ids is sorted!
    for id in actor_ids {
        hasher.update(id.to_le_bytes());
    }

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

// =============================================================================
// TESTS
// =============================================================================
