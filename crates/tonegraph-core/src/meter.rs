//! Lock-free stereo level snapshots.
//!
//! The audio thread overwrites both channels once per block with the block's
//! peak magnitude; monitoring code copies them out whenever it likes. Reads are
//! per-channel atomic, so a reader may see the left value of one block next to
//! the right value of the following one. That is fine for metering.

use std::sync::atomic::{AtomicU32, Ordering};

/// Number of metered channels.
pub const METER_CHANNELS: usize = 2;

/// Per-channel instantaneous amplitude, written by audio, read by monitors.
#[derive(Debug)]
pub struct LevelMeter {
    levels: [AtomicU32; METER_CHANNELS],
}

impl LevelMeter {
    /// Creates a meter reading silence.
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| AtomicU32::new(0.0f32.to_bits())),
        }
    }

    /// Stores one channel's level (audio thread).
    #[inline]
    pub fn store(&self, channel: usize, level: f32) {
        if let Some(slot) = self.levels.get(channel) {
            slot.store(level.to_bits(), Ordering::Relaxed);
        }
    }

    /// Stores the peak magnitude of each channel's block (audio thread).
    pub fn update(&self, left: &[f32], right: &[f32]) {
        self.store(0, block_peak(left));
        self.store(1, block_peak(right));
    }

    /// Copies out the latest values.
    pub fn snapshot(&self) -> [f32; METER_CHANNELS] {
        core::array::from_fn(|ch| f32::from_bits(self.levels[ch].load(Ordering::Relaxed)))
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest absolute sample value in a block.
#[inline]
pub fn block_peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}
