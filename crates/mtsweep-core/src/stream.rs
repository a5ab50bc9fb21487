//! Per-lane generator state initialization.
//!
//! Every logical lane owns an independent Mersenne Twister stream of
//! [`STATE_WIDTH`] words followed by one reserved word that the kernel uses
//! as its position counter. The state is a flat buffer of `u32`, lane-major,
//! so it can be copied to the device as-is.
//!
//! Seeding follows the standard MT initialization recurrence, starting each
//! lane from `lane + seed * lane_ceiling`:
//!
//! ```text
//! state[lane][0] = lane + seed * lane_ceiling
//! state[lane][j] = C1 * (state[lane][j-1] ^ (state[lane][j-1] >> 30)) + j   for 1 <= j < W
//! state[lane][W] = 0
//! ```

/// Internal state width `W` of each per-lane generator.
pub const STATE_WIDTH: usize = 19;

/// Words per lane: the generator state plus the position counter.
pub const WORDS_PER_LANE: usize = STATE_WIDTH + 1;

/// Multiplier of the initialization recurrence.
pub const INIT_MULTIPLIER: u32 = 1_812_433_253;

/// Mask applied to each recurrence step.
pub const WORD_MASK: u32 = 0xFFFF_FFFF;

/// Initial generator state for every logical lane of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    words: Vec<u32>,
    lane_count: usize,
    seed: u32,
}

impl StreamState {
    /// Number of logical lanes covered.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Seed this state was derived from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// State words of a single lane, including the trailing counter.
    ///
    /// # Panics
    ///
    /// Panics if `lane >= lane_count()`.
    pub fn lane(&self, lane: usize) -> &[u32] {
        let start = lane * WORDS_PER_LANE;
        &self.words[start..start + WORDS_PER_LANE]
    }

    /// All words, lane-major.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Byte view for device upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Size of the state in bytes.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<u32>()
    }
}

/// Derive the state of `lane_ceiling * oversubscription_factor` lanes from a seed.
///
/// The whole buffer is recomputed on every call; there is no incremental
/// update. Runs in `O(lanes * W)`.
pub fn seed_states(seed: u32, lane_ceiling: u32, oversubscription_factor: u32) -> StreamState {
    let lane_count = lane_ceiling as usize * oversubscription_factor as usize;
    let base = seed.wrapping_mul(lane_ceiling);

    let mut words = vec![0u32; lane_count * WORDS_PER_LANE];

    for (lane, slot) in words.chunks_exact_mut(WORDS_PER_LANE).enumerate() {
        slot[0] = (lane as u32).wrapping_add(base);
        for j in 1..STATE_WIDTH {
            let prev = slot[j - 1];
            slot[j] = INIT_MULTIPLIER
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(j as u32)
                & WORD_MASK;
        }
        slot[STATE_WIDTH] = 0;
    }

    StreamState {
        words,
        lane_count,
        seed,
    }
}
