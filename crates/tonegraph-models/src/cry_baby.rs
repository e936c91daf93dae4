//! Cry Baby wah node around the nodal-DK circuit.
//!
//! The pedal position (`control_freq`, 0–1) is ramped over 1 ms and mapped
//! through the pot taper `0.1 + 0.89·sqrt(x)` to the wiper fraction α. The
//! pot halves become `(1 − α)·VR1` and `α·VR1`. While the ramp runs the pots
//! are restamped once per 32-sample sub-block, using the ramp value at the
//! end of the sub-block; otherwise the cached inverse is reused.
//!
//! Input port 1 is a control input. While it is connected, `control_freq` is
//! disabled and the block mean of the control signal (clamped to 0–1) drives
//! the sweep instead.
//!
//! The circuit needs its 9 V bias to settle, so `prepare` pre-rolls silent
//! blocks until the output has stayed below 1e-4 for 10 ms, up to
//! [`WahTuning::preroll_max_blocks`] blocks.

use tonegraph_core::{
    DcBlocker, OptionsHandle, Oversampler, ParamDescriptor, ParamSet, ParamSmoother, Params,
    PortDescriptor, PortLayout, Processor, ProcessorCategory, ProcessorOptions, block_peak,
};

use crate::dk::WahCircuit;
use crate::tuning::WahTuning;

/// Parameter index of `control_freq`.
pub const CONTROL_FREQ: usize = 1;

/// Input index of the frequency modulation port.
pub const FREQ_MOD_PORT: usize = 1;

const PARAMS: &[ParamDescriptor] = &[ParamDescriptor::percent("control_freq", "Freq", 0.5)];

const INPUTS: &[PortDescriptor] = &[
    PortDescriptor::audio_in("in"),
    PortDescriptor::control_in("freq mod"),
];
const OUTPUTS: &[PortDescriptor] = &[PortDescriptor::audio_out("out")];

const SWEEP_RAMP_SECONDS: f32 = 0.001;
const POT_UPDATE_INTERVAL: usize = 32;
const DC_BLOCK_HZ: f32 = 30.0;

/// Output magnitude the pre-roll waits for.
pub const PREROLL_THRESHOLD: f32 = 1e-4;

/// How long the output must stay below [`PREROLL_THRESHOLD`].
pub const PREROLL_QUIET_SECONDS: f32 = 0.01;

/// Pedal position to wiper fraction.
fn pot_taper(x: f32) -> f32 {
    0.1 + 0.89 * libm::sqrtf(x.max(0.0))
}

/// Stereo Cry Baby wah.
#[derive(Debug)]
pub struct CryBaby {
    params: Params,
    options: OptionsHandle,
    tuning: WahTuning,
    circuit: WahCircuit,
    sweep: ParamSmoother,
    dc_blockers: [DcBlocker; 2],
    oversamplers: [Oversampler; 2],
    oversampling: bool,
    /// Wiper fraction the pots were last stamped with.
    alpha: f32,
    /// Control-port value for the coming block.
    modulation: Option<f32>,
    preroll: [Vec<f32>; 2],
    preroll_blocks: usize,
}

impl Default for CryBaby {
    fn default() -> Self {
        Self::new()
    }
}

impl CryBaby {
    /// Registry identifier.
    pub const TYPE_ID: &'static str = "cry_baby";

    /// Creates a wah with default tuning. Call `prepare` before use.
    pub fn new() -> Self {
        Self::with_tuning(WahTuning::default())
    }

    /// Creates a wah with explicit tuning.
    pub fn with_tuning(tuning: WahTuning) -> Self {
        Self {
            params: ParamSet::shared(PARAMS),
            options: OptionsHandle::new(ProcessorOptions::new(
                "Nodal-DK model of a Cry Baby wah pedal with a controllable sweep.",
                &["Jatin Chowdhury"],
            )),
            tuning,
            circuit: WahCircuit::new(tuning.solver()),
            sweep: ParamSmoother::new(SWEEP_RAMP_SECONDS).with_mapping(pot_taper),
            dc_blockers: [
                DcBlocker::new(DC_BLOCK_HZ, 48000.0),
                DcBlocker::new(DC_BLOCK_HZ, 48000.0),
            ],
            oversamplers: [Oversampler::new(), Oversampler::new()],
            oversampling: false,
            alpha: f32::NAN,
            modulation: None,
            preroll: [Vec::new(), Vec::new()],
            preroll_blocks: 0,
        }
    }

    /// Whether the last `prepare` engaged the oversampler.
    pub fn is_oversampling(&self) -> bool {
        self.oversampling
    }

    /// Silent blocks run by the last `prepare`.
    pub fn preroll_blocks(&self) -> usize {
        self.preroll_blocks
    }

    /// Pot halves currently stamped into the circuit.
    pub fn pots(&self) -> (f64, f64) {
        self.circuit.pots()
    }

    fn stamp_pots(&mut self, alpha: f32) {
        let vr1 = self.circuit.components().pot;
        let a = f64::from(alpha);
        // a rejected restamp keeps the previous inverse and is retried
        if self.circuit.update_pots((1.0 - a) * vr1, a * vr1) {
            self.alpha = alpha;
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], target: f32) {
        let len = left.len().min(right.len());
        let (left, right) = (&mut left[..len], &mut right[..len]);

        self.sweep.process(target, len);
        self.dc_blockers[0].process_block(left);
        self.dc_blockers[1].process_block(right);

        let smoothing = self.sweep.is_smoothing();
        let oversampling = self.oversampling;
        let mut start = 0;
        while start < len {
            let end = (start + POT_UPDATE_INTERVAL).min(len);

            let alpha = if smoothing {
                self.sweep
                    .smoothed_buffer()
                    .get(end - 1)
                    .copied()
                    .unwrap_or_else(|| self.sweep.current_value())
            } else {
                self.sweep.current_value()
            };
            if alpha != self.alpha {
                self.stamp_pots(alpha);
            }

            let channels: [&mut [f32]; 2] = [&mut left[start..end], &mut right[start..end]];
            for (ch, block) in channels.into_iter().enumerate() {
                let circuit = &mut self.circuit;
                let mut solve = |samples: &mut [f32]| {
                    for s in samples.iter_mut() {
                        *s = circuit.process_sample(ch, f64::from(*s)) as f32;
                    }
                };
                if oversampling {
                    self.oversamplers[ch].process(block, solve);
                } else {
                    solve(block);
                }
            }
            start = end;
        }
    }

    /// Runs silent blocks until the bias transient has died out.
    ///
    /// Stops once the output has stayed at or below [`PREROLL_THRESHOLD`] for
    /// [`PREROLL_QUIET_SECONDS`] (and at least one block), or after
    /// `preroll_max_blocks` blocks.
    fn run_preroll(&mut self, sample_rate: f32) -> usize {
        let [mut left, mut right] = std::mem::take(&mut self.preroll);
        let target = self.sweep.target();
        let quiet_needed = ((PREROLL_QUIET_SECONDS * sample_rate) as usize).max(left.len());
        let mut quiet = 0;
        let mut blocks = 0;
        if !left.is_empty() {
            while blocks < self.tuning.preroll_max_blocks {
                left.fill(0.0);
                right.fill(0.0);
                self.render(&mut left, &mut right, target);
                blocks += 1;
                if block_peak(&left).max(block_peak(&right)) <= PREROLL_THRESHOLD {
                    quiet += left.len();
                    if quiet >= quiet_needed {
                        break;
                    }
                } else {
                    quiet = 0;
                }
            }
        }
        self.preroll = [left, right];
        blocks
    }
}

impl Processor for CryBaby {
    fn processor_type(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn name(&self) -> &'static str {
        "Cry Baby"
    }

    fn category(&self) -> ProcessorCategory {
        ProcessorCategory::Other
    }

    fn port_layout(&self) -> PortLayout {
        PortLayout {
            inputs: INPUTS,
            outputs: OUTPUTS,
        }
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
        if self.oversampling {
            for os in &mut self.oversamplers {
                os.prepare(policy.ratio, block_size.max(1));
            }
        }
        self.circuit.reset(f64::from(policy.solver_rate(sample_rate)));

        for blocker in &mut self.dc_blockers {
            *blocker = DcBlocker::new(DC_BLOCK_HZ, sample_rate);
        }

        self.sweep.prepare(sample_rate, block_size);
        self.sweep.reset(self.params.value(CONTROL_FREQ));
        self.stamp_pots(self.sweep.current_value());
        self.modulation = None;

        self.preroll = [vec![0.0; block_size], vec![0.0; block_size]];
        self.preroll_blocks = self.run_preroll(sample_rate);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            blocks = self.preroll_blocks,
            fallbacks = self.circuit.fallbacks(),
            "cry baby pre-roll"
        );
    }

    fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]) {
        let target = self
            .modulation
            .take()
            .unwrap_or_else(|| self.params.value(CONTROL_FREQ));
        self.render(left, right, target);
    }

    fn set_control_input(&mut self, port: usize, samples: &[f32]) {
        if port != FREQ_MOD_PORT || samples.is_empty() {
            return;
        }
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        if mean.is_finite() {
            self.modulation = Some(mean.clamp(0.0, 1.0));
        }
    }

    fn parameters_to_disable_when_input_connected(&self, port: usize) -> &'static [&'static str] {
        if port == FREQ_MOD_PORT {
            &["control_freq"]
        } else {
            &[]
        }
    }

    fn solver_fallbacks(&self) -> u64 {
        self.circuit.fallbacks()
    }
}
