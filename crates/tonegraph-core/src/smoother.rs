//! Block-based linear parameter smoothing with a taper mapping.
//!
//! [`ParamSmoother`] turns a control value that changes between blocks into a
//! per-sample trajectory. The ramp length is specified in seconds, so the
//! audible behaviour is the same at every sample rate: a step from `A` to `B`
//! always takes `ceil(ramp_seconds * sample_rate)` samples (at least one).
//!
//! The ramp itself is linear in the control domain. An optional mapping
//! function is applied on the way out, which lets a node give a knob the taper
//! of the physical potentiometer it models.
//!
//! # Usage
//!
//! ```rust
//! use tonegraph_core::ParamSmoother;
//!
//! let mut alpha = ParamSmoother::new(0.001).with_mapping(|x| x.sqrt());
//! alpha.prepare(48000.0, 64);
//! alpha.reset(0.25);
//!
//! alpha.process(1.0, 64);
//! if alpha.is_smoothing() {
//!     let trajectory = alpha.smoothed_buffer();
//!     assert_eq!(trajectory.len(), 64);
//! } else {
//!     let _steady = alpha.current_value();
//! }
//! ```

/// Mapping applied to the linear ramp output.
pub type MappingFn = fn(f32) -> f32;

fn identity(x: f32) -> f32 {
    x
}

/// Linear ramp smoother with a per-block trajectory buffer.
///
/// `process` is allocation-free; the trajectory buffer is sized by
/// [`prepare`](Self::prepare).
#[derive(Debug, Clone)]
pub struct ParamSmoother {
    ramp_seconds: f32,
    sample_rate: f32,
    mapping: MappingFn,
    /// Unmapped value at the current position.
    current: f32,
    /// Unmapped value the ramp started from.
    start: f32,
    target: f32,
    ramp_len: u32,
    ramp_pos: u32,
    smoothing: bool,
    buffer: Vec<f32>,
    buffer_len: usize,
}

impl ParamSmoother {
    /// Creates a smoother with the given ramp length in seconds.
    pub fn new(ramp_seconds: f32) -> Self {
        Self {
            ramp_seconds: ramp_seconds.max(0.0),
            sample_rate: 48000.0,
            mapping: identity,
            current: 0.0,
            start: 0.0,
            target: 0.0,
            ramp_len: 0,
            ramp_pos: 0,
            smoothing: false,
            buffer: Vec::new(),
            buffer_len: 0,
        }
    }

    /// Sets the taper applied to every value read out of the smoother.
    pub fn with_mapping(mut self, mapping: MappingFn) -> Self {
        self.mapping = mapping;
        self
    }

    /// Changes the ramp length. Takes effect on the next target change.
    pub fn set_ramp_length(&mut self, seconds: f32) {
        self.ramp_seconds = seconds.max(0.0);
    }

    /// Ramp length in seconds.
    pub fn ramp_length(&self) -> f32 {
        self.ramp_seconds
    }

    /// Number of samples a full step takes at the prepared sample rate.
    pub fn ramp_samples(&self) -> u32 {
        let samples = (f64::from(self.ramp_seconds) * f64::from(self.sample_rate)).ceil();
        (samples as u32).max(1)
    }

    /// Resets the ramp and sizes the trajectory buffer.
    ///
    /// Any ramp in progress is completed instantly.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        self.sample_rate = sample_rate;
        self.buffer.clear();
        self.buffer.resize(block_size, (self.mapping)(self.target));
        self.buffer_len = 0;
        self.reset(self.target);
    }

    /// Jumps to `value` without ramping.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.start = value;
        self.target = value;
        self.ramp_len = 0;
        self.ramp_pos = 0;
        self.smoothing = false;
    }

    /// Advances the smoother by `num_samples` toward `target`.
    ///
    /// When any of those samples were mid-ramp, [`is_smoothing`](Self::is_smoothing)
    /// returns true and [`smoothed_buffer`](Self::smoothed_buffer) holds the
    /// mapped trajectory. Samples past the prepared block size still advance
    /// the ramp but are not recorded.
    pub fn process(&mut self, target: f32, num_samples: usize) {
        if target != self.target {
            self.start = self.current;
            self.target = target;
            self.ramp_len = self.ramp_samples();
            self.ramp_pos = 0;
        }

        self.smoothing = self.ramp_pos < self.ramp_len;
        if !self.smoothing {
            self.buffer_len = 0;
            return;
        }

        let recorded = num_samples.min(self.buffer.len());
        for n in 0..num_samples {
            self.step();
            if n < recorded {
                self.buffer[n] = (self.mapping)(self.current);
            }
        }
        self.buffer_len = recorded;
    }

    #[inline]
    fn step(&mut self) {
        if self.ramp_pos >= self.ramp_len {
            return;
        }
        self.ramp_pos += 1;
        if self.ramp_pos == self.ramp_len {
            self.current = self.target;
        } else {
            let frac = self.ramp_pos as f32 / self.ramp_len as f32;
            let value = self.start + (self.target - self.start) * frac;
            // rounding must never carry an intermediate sample past the target
            self.current = if self.target >= self.start {
                value.min(self.target)
            } else {
                value.max(self.target)
            };
        }
    }

    /// Whether the last `process` call produced a ramp.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.smoothing
    }

    /// Mapped per-sample trajectory of the last `process` call.
    ///
    /// Empty when the last call was not smoothing.
    #[inline]
    pub fn smoothed_buffer(&self) -> &[f32] {
        &self.buffer[..self.buffer_len]
    }

    /// Mapped value at the current ramp position.
    #[inline]
    pub fn current_value(&self) -> f32 {
        (self.mapping)(self.current)
    }

    /// Unmapped target of the current or last ramp.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

impl Default for ParamSmoother {
    fn default() -> Self {
        Self::new(0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_state_is_not_smoothing() {
        let mut s = ParamSmoother::new(0.01);
        s.prepare(48000.0, 128);
        s.reset(0.5);
        s.process(0.5, 128);
        assert!(!s.is_smoothing());
        assert!(s.smoothed_buffer().is_empty());
        assert_eq!(s.current_value(), 0.5);
    }

    #[test]
    fn step_reaches_target_in_ramp_samples() {
        let mut s = ParamSmoother::new(0.01);
        s.prepare(48000.0, 1024);
        s.reset(0.0);
        assert_eq!(s.ramp_samples(), 480);

        s.process(1.0, 480);
        assert!(s.is_smoothing());
        let buf = s.smoothed_buffer();
        assert_eq!(buf.len(), 480);
        assert_eq!(buf[479], 1.0);
        assert!(buf[478] < 1.0);

        s.process(1.0, 64);
        assert!(!s.is_smoothing(), "ramp should be finished");
    }

    #[test]
    fn ramp_spans_blocks() {
        let mut s = ParamSmoother::new(0.01);
        s.prepare(48000.0, 128);
        s.reset(0.0);
        for _ in 0..3 {
            s.process(1.0, 128);
            assert!(s.is_smoothing());
        }
        // 384 of 480 samples done
        assert!(s.current_value() < 1.0);
        s.process(1.0, 128);
        assert!(s.is_smoothing());
        assert_eq!(s.current_value(), 1.0);
        assert_eq!(s.smoothed_buffer()[127], 1.0);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current_value() {
        let mut s = ParamSmoother::new(0.01);
        s.prepare(48000.0, 240);
        s.reset(0.0);
        s.process(1.0, 240);
        let midway = s.current_value();
        assert!((midway - 0.5).abs() < 1e-3);

        s.process(0.0, 1);
        let first = s.smoothed_buffer()[0];
        assert!(first < midway && first > 0.49);
    }

    #[test]
    fn mapping_applies_to_every_readout() {
        let mut s = ParamSmoother::new(0.001).with_mapping(|x| 2.0 * x);
        s.prepare(48000.0, 64);
        s.reset(0.25);
        assert_eq!(s.current_value(), 0.5);
        s.process(0.5, 64);
        assert_eq!(s.current_value(), 1.0);
        assert!(s.smoothed_buffer().iter().all(|v| (0.5..=1.0).contains(v)));
    }

    #[test]
    fn zero_ramp_length_takes_one_sample() {
        let mut s = ParamSmoother::new(0.0);
        s.prepare(44100.0, 16);
        s.reset(0.0);
        s.process(0.8, 16);
        assert!(s.is_smoothing());
        assert_eq!(s.smoothed_buffer()[0], 0.8);
    }

    #[test]
    fn prepare_is_repeatable() {
        let mut s = ParamSmoother::new(0.01);
        s.prepare(48000.0, 32);
        s.reset(0.0);
        s.process(1.0, 32);
        s.prepare(96000.0, 64);
        assert!(!s.is_smoothing());
        assert_eq!(s.current_value(), 1.0);
        assert_eq!(s.ramp_samples(), 960);
    }

    #[test]
    fn oversized_block_advances_without_overflow() {
        let mut s = ParamSmoother::new(0.001);
        s.prepare(48000.0, 8);
        s.reset(0.0);
        s.process(1.0, 100);
        assert_eq!(s.smoothed_buffer().len(), 8);
        assert_eq!(s.current_value(), 1.0);
    }
}
