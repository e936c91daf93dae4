//! Ramped gain stages for drive/level staging around nonlinearities.
//!
//! [`RampedGain`] applies a linear gain that moves toward its target through a
//! [`ParamSmoother`], never in a single step. [`drive_gains`] holds the staging
//! rule shared by drive-style nodes: the output gain undoes the input gain
//! fully below unity and by its square root above it, which keeps loudness
//! roughly level as drive goes up without flattening the added saturation.
//!
//! Nodes that ramp drive should ramp only the input stage and derive the
//! output stage per sample with [`drive_output_gain`]. Two independent ramps
//! pass through products the rule never allows.

use crate::smoother::ParamSmoother;

/// Linear gain ramped over a fixed time.
#[derive(Debug, Clone)]
pub struct RampedGain {
    smoother: ParamSmoother,
    target: f32,
}

impl RampedGain {
    /// Creates a unity gain that ramps over `ramp_seconds`.
    pub fn new(ramp_seconds: f32) -> Self {
        let mut smoother = ParamSmoother::new(ramp_seconds);
        smoother.reset(1.0);
        Self {
            smoother,
            target: 1.0,
        }
    }

    /// Sizes the ramp buffer and jumps to the current target.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        self.smoother.prepare(sample_rate, block_size);
        self.smoother.reset(self.target);
    }

    /// Sets the gain the next block ramps toward.
    pub fn set_gain_linear(&mut self, gain: f32) {
        self.target = gain;
    }

    /// Current gain value.
    pub fn current(&self) -> f32 {
        self.smoother.current_value()
    }

    /// Advances the ramp by `gains.len()` samples and writes the gain of
    /// each one.
    pub fn fill(&mut self, gains: &mut [f32]) {
        self.smoother.process(self.target, gains.len());
        if self.smoother.is_smoothing() {
            let ramp = self.smoother.smoothed_buffer();
            let tail = ramp.last().copied().unwrap_or(self.target);
            for (n, g) in gains.iter_mut().enumerate() {
                *g = ramp.get(n).copied().unwrap_or(tail);
            }
        } else {
            gains.fill(self.smoother.current_value());
        }
    }

    /// Applies the gain to every channel of a block.
    ///
    /// All channels share one ramp, so `channels` must have equal lengths.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some(len) = channels.first().map(|c| c.len()) else {
            return;
        };
        self.smoother.process(self.target, len);
        if self.smoother.is_smoothing() {
            let ramp = self.smoother.smoothed_buffer();
            let tail = ramp.last().copied().unwrap_or(self.target);
            for ch in channels.iter_mut() {
                for (n, s) in ch.iter_mut().enumerate() {
                    *s *= ramp.get(n).copied().unwrap_or(tail);
                }
            }
        } else {
            let g = self.smoother.current_value();
            for ch in channels.iter_mut() {
                for s in ch.iter_mut() {
                    *s *= g;
                }
            }
        }
    }
}

/// Input and output gains for a drive amount in \[0, 1\].
///
/// Input gain runs linearly from 0.5 to 10.
pub fn drive_gains(drive: f32) -> (f32, f32) {
    let input = 0.5 + drive.clamp(0.0, 1.0) * 9.5;
    (input, drive_output_gain(input))
}

/// Output gain paired with a linear input gain.
///
/// The product of the two is 1 below unity and `sqrt(input)` above it.
#[inline]
pub fn drive_output_gain(input: f32) -> f32 {
    if input < 1.0 {
        1.0 / input
    } else {
        1.0 / libm::sqrtf(input)
    }
}
