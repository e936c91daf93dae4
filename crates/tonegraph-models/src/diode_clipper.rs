//! Diode clipper node: drive staging around the WDF clipper.
//!
//! ## Parameter Indices
//!
//! | Index | Id | Range | Default |
//! |-------|----|-------|---------|
//! | 0 | `on_off` | off/on | on |
//! | 1 | `cutoff` | 200–20000 Hz (centre 5 kHz) | 2000 |
//! | 2 | `drive` | 0–100% | 50% |
//! | 3 | `diode` | GZ34, 1N34, 1N4148 | GZ34 |
//! | 4 | `num_diodes` | 0.3–3 (centre 1) | 1 |
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::Processor;
//! use tonegraph_models::DiodeClipper;
//!
//! let mut clipper = DiodeClipper::new();
//! clipper.params().set("drive", 1.0);
//! clipper.prepare(48000.0, 64);
//!
//! let mut left = [0.5f32; 64];
//! let mut right = [0.5f32; 64];
//! clipper.process_audio(&mut left, &mut right);
//! assert!(left.iter().all(|s| s.is_finite()));
//! ```

use tonegraph_core::{
    OptionsHandle, Oversampler, ParamDescriptor, ParamSet, Params, Processor, ProcessorCategory,
    ProcessorOptions, RampedGain, drive_gains, drive_output_gain,
};

use crate::tuning::ClipperTuning;
use crate::wdf::{DiodeClipperWdf, DiodeType};

/// Parameter index of `cutoff`.
pub const CUTOFF: usize = 1;
/// Parameter index of `drive`.
pub const DRIVE: usize = 2;
/// Parameter index of `diode`.
pub const DIODE: usize = 3;
/// Parameter index of `num_diodes`.
pub const NUM_DIODES: usize = 4;

const PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor::frequency("cutoff", "Cutoff", 200.0, 20000.0, 2000.0, 5000.0),
    ParamDescriptor::percent("drive", "Drive", 0.5),
    ParamDescriptor::choice("diode", "Diodes", DiodeType::LABELS, 0),
    ParamDescriptor::float("num_diodes", "# Diodes", 0.3, 3.0, 1.0).with_centre(1.0),
];

const GAIN_RAMP_SECONDS: f32 = 0.01;
const DEFAULT_BLOCK: usize = 512;

/// Stereo diode clipper.
#[derive(Debug)]
pub struct DiodeClipper {
    params: Params,
    options: OptionsHandle,
    tuning: ClipperTuning,
    circuits: [DiodeClipperWdf; 2],
    oversamplers: [Oversampler; 2],
    oversampling: bool,
    input_gain: RampedGain,
    /// Per-sample input gain of the current chunk.
    drive_ramp: Vec<f32>,
}

impl Default for DiodeClipper {
    fn default() -> Self {
        Self::new()
    }
}

impl DiodeClipper {
    /// Registry identifier.
    pub const TYPE_ID: &'static str = "diode_clipper";

    /// Creates a clipper with default tuning. Call `prepare` before use.
    pub fn new() -> Self {
        Self::with_tuning(ClipperTuning::default())
    }

    /// Creates a clipper with explicit tuning.
    pub fn with_tuning(tuning: ClipperTuning) -> Self {
        Self {
            params: ParamSet::shared(PARAMS),
            options: OptionsHandle::new(ProcessorOptions::new(
                "Wave digital filter model of an RC lowpass into an antiparallel diode pair.",
                &["Jatin Chowdhury"],
            )),
            tuning,
            circuits: [DiodeClipperWdf::new(48000.0), DiodeClipperWdf::new(48000.0)],
            oversamplers: [Oversampler::new(), Oversampler::new()],
            oversampling: false,
            input_gain: RampedGain::new(GAIN_RAMP_SECONDS),
            drive_ramp: vec![1.0; DEFAULT_BLOCK],
        }
    }

    /// Whether the last `prepare` engaged the oversampler.
    pub fn is_oversampling(&self) -> bool {
        self.oversampling
    }

    /// Runs one chunk no longer than `drive_ramp`.
    ///
    /// Only the input gain ramps; the output gain is derived from it per
    /// sample.
    fn process_chunk(&mut self, left: &mut [f32], right: &mut [f32]) {
        let cutoff = self.params.value(CUTOFF);
        let is = DiodeType::from_index(self.params.value(DIODE)).saturation_current();
        let n_diodes = self.params.value(NUM_DIODES);

        let ramp = &mut self.drive_ramp[..left.len()];
        self.input_gain.fill(ramp);
        for ch in [&mut *left, &mut *right] {
            for (s, g) in ch.iter_mut().zip(ramp.iter()) {
                *s *= g;
            }
        }

        let oversampling = self.oversampling;
        let channels: [&mut [f32]; 2] = [&mut *left, &mut *right];
        for ((block, circuit), os) in channels
            .into_iter()
            .zip(&mut self.circuits)
            .zip(&mut self.oversamplers)
        {
            circuit.set_parameters(cutoff, is, n_diodes);
            if oversampling {
                os.process(block, |hi| circuit.process_block(hi));
            } else {
                circuit.process_block(block);
            }
        }

        for g in ramp.iter_mut() {
            *g = drive_output_gain(*g);
        }
        for ch in [left, right] {
            for (s, g) in ch.iter_mut().zip(ramp.iter()) {
                *s *= g;
            }
        }
    }
}

impl Processor for DiodeClipper {
    fn processor_type(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn name(&self) -> &'static str {
        "Diode Clipper"
    }

    fn category(&self) -> ProcessorCategory {
        ProcessorCategory::Drive
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn options(&self) -> &OptionsHandle {
        &self.options
    }

    fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        let policy = self.tuning.oversampling;
        self.oversampling = policy.engages(sample_rate);
        let solver_rate = policy.solver_rate(sample_rate);
        for (circuit, os) in self.circuits.iter_mut().zip(&mut self.oversamplers) {
            circuit.reset(solver_rate);
            if self.oversampling {
                os.prepare(policy.ratio, block_size.max(1));
            }
        }

        let (input, _) = drive_gains(self.params.value(DRIVE));
        self.input_gain.set_gain_linear(input);
        self.input_gain.prepare(sample_rate, block_size);
        self.drive_ramp.resize(block_size.max(1), 1.0);
    }

    fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]) {
        let (input, _) = drive_gains(self.params.value(DRIVE));
        self.input_gain.set_gain_linear(input);

        let len = left.len().min(right.len());
        let chunk = self.drive_ramp.len();
        let mut start = 0;
        while start < len {
            let end = (start + chunk).min(len);
            self.process_chunk(&mut left[start..end], &mut right[start..end]);
            start = end;
        }
    }
}
