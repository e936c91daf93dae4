//! DC blocking filter.
//!
//! First-order highpass: H(z) = (1 - z^-1) / (1 - R*z^-1), with
//! R = 1 - 2*pi*fc/fs. Circuit models put one in front of a solver whose
//! operating point must not drift with input offset.

use core::f32::consts::PI;

/// First-order DC blocker with a configurable cutoff.
///
/// ```rust
/// use tonegraph_core::DcBlocker;
///
/// let mut blocker = DcBlocker::new(30.0, 48000.0);
/// let y = blocker.process(0.6);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct DcBlocker {
    cutoff_hz: f32,
    coeff: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    /// Creates a blocker for the given cutoff and sample rate.
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            cutoff_hz,
            coeff: Self::calculate_coeff(cutoff_hz, sample_rate),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// y[n] = x[n] - x[n-1] + R * y[n-1]
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.x_prev + self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    /// Filters a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for s in block.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Clears the filter history.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }

    /// Recomputes R for a new sample rate, keeping the cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = Self::calculate_coeff(self.cutoff_hz, sample_rate);
    }

    /// Current R coefficient.
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    fn calculate_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let r = 1.0 - (2.0 * PI * cutoff_hz / sample_rate);
        r.clamp(0.9, 0.9999)
    }
}
