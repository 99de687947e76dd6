// src/audio/level.rs
// Latest-value loudness cell shared between the audio thread and the frame loop

use std::sync::atomic::{AtomicU32, Ordering};

/// Single-slot loudness cell.
///
/// The audio callback publishes one RMS value per block, the frame loop reads
/// whatever was published last. No queue, no history: intermediate values the
/// reader never sees are simply overwritten.
#[derive(Debug)]
pub struct LevelCell {
    level: AtomicU32,     // Latest RMS (as f32 bits)
    published: AtomicU32, // Blocks published so far (wrapping)
}

impl LevelCell {
    pub fn new() -> Self {
        Self {
            level: AtomicU32::new(0),
            published: AtomicU32::new(0),
        }
    }

    /// Store a new level (call from audio thread, lock-free and allocation-free)
    #[inline]
    pub fn publish(&self, level: f32) {
        let level = if level.is_finite() { level.max(0.0) } else { 0.0 };
        self.level.store(level.to_bits(), Ordering::Relaxed);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Most recently published level
    #[inline]
    pub fn latest(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    /// Number of blocks published, wraps at `u32::MAX`. The header derives the
    /// capture block rate from it.
    pub fn published_count(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Convert linear level to dBFS
    pub fn to_db(level: f32) -> f32 {
        if level <= 0.0 {
            -96.0 // Silence
        } else {
            (20.0 * level.log10()).max(-96.0)
        }
    }

    /// Colour band for a linear level
    pub fn band(level: f32) -> LevelBand {
        if level >= 1.0 {
            LevelBand::Clip
        } else if level >= 0.5 {
            LevelBand::Hot
        } else if level >= 0.1 {
            LevelBand::Warn
        } else {
            LevelBand::Normal
        }
    }
}

impl Default for LevelCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Header meter colouring. Thresholds sit lower than a mixing meter because the
/// field saturates at an RMS of 0.1 with the default input gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    Normal, // below 0.1, field still responding linearly
    Warn,   // 0.1 - 0.5, field saturated
    Hot,    // 0.5 - 1.0
    Clip,   // >= 1.0
}
