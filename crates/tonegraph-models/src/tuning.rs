//! Per-model tunables: oversampling policy, solver limits, pre-roll bound.
//!
//! Every field has a default, so a tuning file only needs the values it
//! overrides:
//!
//! ```toml
//! [cry_baby]
//! max_iterations = 12
//!
//! [cry_baby.oversampling]
//! below_sample_rate = 96000.0
//! ratio = "x4"
//! ```

use tonegraph_core::{OversamplingPolicy, OversamplingRatio};

use crate::dk::SolverSettings;

/// Tunables for every model in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelTuning {
    /// Diode clipper.
    pub diode_clipper: ClipperTuning,
    /// Cry Baby wah.
    pub cry_baby: WahTuning,
}

/// Diode clipper tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClipperTuning {
    /// The closed-form WDF is stable at any rate; oversampling only reduces
    /// aliasing.
    pub oversampling: OversamplingPolicy,
}

impl Default for ClipperTuning {
    fn default() -> Self {
        Self {
            oversampling: OversamplingPolicy::disabled(),
        }
    }
}

/// Cry Baby tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WahTuning {
    /// 2x below 88.2 kHz by default.
    pub oversampling: OversamplingPolicy,
    /// Newton–Raphson iteration cap per sample.
    pub max_iterations: usize,
    /// Newton–Raphson step tolerance in volts.
    pub tolerance: f64,
    /// Upper bound on silent blocks run at `prepare`.
    pub preroll_max_blocks: usize,
}

impl WahTuning {
    /// Solver limits derived from this tuning.
    pub fn solver(&self) -> SolverSettings {
        SolverSettings {
            max_iterations: self.max_iterations.max(1),
            tolerance: self.tolerance,
        }
    }
}

impl Default for WahTuning {
    fn default() -> Self {
        let solver = SolverSettings::default();
        Self {
            oversampling: OversamplingPolicy::below(88200.0, OversamplingRatio::X2),
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
            preroll_max_blocks: 2000,
        }
    }
}
