// src/audio/estimator.rs
// Per-block loudness estimate (mono mixdown + RMS), published to a LevelCell

use super::LevelCell;
use crate::error::FieldError;
use std::sync::Arc;
use wide::f32x4;

/// Observes audio blocks and publishes one RMS value per block.
///
/// The estimator never filters: `process_block` copies every input sample to
/// the matching output slot untouched. Holds no state across blocks.
/// REAL-TIME SAFE: no allocation, no locks, loops bounded by the block size.
#[derive(Debug, Clone)]
pub struct SignalEstimator {
    level: Arc<LevelCell>,
}

impl SignalEstimator {
    pub fn new(level: Arc<LevelCell>) -> Self {
        Self { level }
    }

    pub fn level(&self) -> &Arc<LevelCell> {
        &self.level
    }

    /// Planar block: `inputs[channel][frame]`, passed through to `outputs`.
    pub fn process_block(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) -> Result<f32, FieldError> {
        Self::check_planar_shape(inputs, outputs)?;

        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            output.copy_from_slice(input);
        }

        let rms = Self::planar_rms(inputs);
        self.level.publish(rms);
        Ok(rms)
    }

    /// Interleaved block as delivered by cpal input callbacks. Observe only.
    pub fn process_interleaved(&self, data: &[f32], channels: usize) -> Result<f32, FieldError> {
        if channels > 0 && data.len() % channels != 0 {
            return Err(FieldError::ShapeMismatch {
                expected: data.len() - data.len() % channels,
                found: data.len(),
            });
        }

        let rms = Self::interleaved_rms(data, channels);
        self.level.publish(rms);
        Ok(rms)
    }

    fn check_planar_shape(inputs: &[&[f32]], outputs: &[&mut [f32]]) -> Result<(), FieldError> {
        if outputs.len() != inputs.len() {
            return Err(FieldError::ShapeMismatch {
                expected: inputs.len(),
                found: outputs.len(),
            });
        }

        let frames = inputs.first().map_or(0, |channel| channel.len());
        let lengths = inputs
            .iter()
            .map(|channel| channel.len())
            .chain(outputs.iter().map(|channel| channel.len()));
        for len in lengths {
            if len != frames {
                return Err(FieldError::ShapeMismatch {
                    expected: frames,
                    found: len,
                });
            }
        }
        Ok(())
    }

    /// RMS of the channel-mean signal, four frames per SIMD lane group
    pub(crate) fn planar_rms(inputs: &[&[f32]]) -> f32 {
        let channels = inputs.len();
        let frames = inputs.first().map_or(0, |channel| channel.len());
        if channels == 0 || frames == 0 {
            return 0.0;
        }

        let inv_channels = 1.0 / channels as f32;
        let inv_vec = f32x4::splat(inv_channels);
        let chunks = frames / 4;

        let mut acc = f32x4::splat(0.0);
        for i in 0..chunks {
            let idx = i * 4;
            let mut mono = f32x4::splat(0.0);
            for channel in inputs {
                mono = mono + f32x4::new([
                    channel[idx],
                    channel[idx + 1],
                    channel[idx + 2],
                    channel[idx + 3],
                ]);
            }
            mono = mono * inv_vec;
            acc = acc + mono * mono;
        }
        let mut sum: f32 = acc.to_array().iter().sum();

        // Handle remainder
        for idx in chunks * 4..frames {
            let mono = inputs.iter().map(|channel| channel[idx]).sum::<f32>() * inv_channels;
            sum += mono * mono;
        }

        (sum / frames as f32).sqrt()
    }

    pub(crate) fn interleaved_rms(data: &[f32], channels: usize) -> f32 {
        if channels == 0 || data.len() < channels {
            return 0.0;
        }

        let inv_channels = 1.0 / channels as f32;
        let mut sum = 0.0f32;
        let mut frames = 0usize;
        for frame in data.chunks_exact(channels) {
            let mono = frame.iter().sum::<f32>() * inv_channels;
            sum += mono * mono;
            frames += 1;
        }

        (sum / frames as f32).sqrt()
    }
}
