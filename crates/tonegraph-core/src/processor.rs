//! The uniform contract every node in a chain implements.
//!
//! A [`Processor`] wraps a circuit model (its solver, smoothers and optional
//! oversampling) behind one block-processing call. The chain never knows which
//! model it is running: it asks for ports and parameters, calls
//! [`prepare`](Processor::prepare) on the control side, and then
//! [`process_audio`](Processor::process_audio) on the audio side.
//!
//! # Threading
//!
//! A processor is built and prepared on the control thread, then moved to the
//! audio thread for good. After that move the control thread talks to it only
//! through its [`Params`] handle (atomic stores) and its [`OptionsHandle`].
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::{
//!     OptionsHandle, ParamDescriptor, ParamSet, Params, Processor, ProcessorCategory,
//! };
//!
//! const LEVEL: usize = 1;
//!
//! struct Trim {
//!     params: Params,
//!     options: OptionsHandle,
//! }
//!
//! impl Processor for Trim {
//!     fn processor_type(&self) -> &'static str { "trim" }
//!     fn name(&self) -> &'static str { "Trim" }
//!     fn category(&self) -> ProcessorCategory { ProcessorCategory::Tone }
//!     fn params(&self) -> &Params { &self.params }
//!     fn options(&self) -> &OptionsHandle { &self.options }
//!     fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}
//!     fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]) {
//!         let g = self.params.value(LEVEL);
//!         left.iter_mut().chain(right.iter_mut()).for_each(|s| *s *= g);
//!     }
//! }
//!
//! let mut trim = Trim {
//!     params: ParamSet::shared(&[ParamDescriptor::float("level", "Level", 0.0, 2.0, 1.0)]),
//!     options: OptionsHandle::default(),
//! };
//! trim.params().set("level", 0.5);
//! let (mut l, mut r) = ([1.0f32; 4], [1.0f32; 4]);
//! trim.process_audio(&mut l, &mut r);
//! assert_eq!(l, [0.5; 4]);
//! ```

use crate::options::OptionsHandle;
use crate::param::{ParamSnapshot, Params};
use crate::port::PortLayout;

/// Broad grouping of processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessorCategory {
    /// Distortion, clipping, saturation.
    Drive,
    /// Filters and EQ.
    Tone,
    /// Everything else (modulation, wah, utilities).
    Other,
    /// Chain endpoints.
    Boundary,
}

impl ProcessorCategory {
    /// Lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Tone => "tone",
            Self::Other => "other",
            Self::Boundary => "boundary",
        }
    }
}

/// A node's audio-processing contract.
pub trait Processor: Send {
    /// Registry identifier, e.g. `"diode_clipper"`. Stable across versions.
    fn processor_type(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    /// Category used for grouping.
    fn category(&self) -> ProcessorCategory;

    /// Port declarations. Defaults to one audio input and one audio output.
    fn port_layout(&self) -> PortLayout {
        PortLayout::mono_effect()
    }

    /// Shared parameter handle.
    fn params(&self) -> &Params;

    /// Shared, observable metadata.
    fn options(&self) -> &OptionsHandle;

    /// Allocates and configures smoothers, solvers and oversampling for
    /// `sample_rate` and blocks of up to `block_size` samples.
    ///
    /// May be called any number of times. Leaves the node ready to produce
    /// click-free output from its first real block.
    fn prepare(&mut self, sample_rate: f32, block_size: usize);

    /// Processes one stereo block in place.
    ///
    /// Runs on the audio thread: must not allocate, lock, or block. Blocks are
    /// never longer than the prepared block size.
    fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Delivers the current block of a connected control input.
    ///
    /// Called by the chain before [`process_audio`](Self::process_audio), once
    /// per connected control port. Nodes without control inputs ignore it.
    fn set_control_input(&mut self, _port: usize, _samples: &[f32]) {}

    /// Parameters that become host-driven while input `port` is connected.
    fn parameters_to_disable_when_input_connected(&self, _port: usize) -> &'static [&'static str] {
        &[]
    }

    /// Parameters that only become meaningful while input `port` is connected.
    fn parameters_to_enable_when_input_connected(&self, _port: usize) -> &'static [&'static str] {
        &[]
    }

    /// Current parameter values. Solver state is not included.
    fn to_state(&self) -> ParamSnapshot {
        self.params().snapshot()
    }

    /// Restores parameter values. Unknown keys are ignored.
    fn from_state(&mut self, state: &ParamSnapshot) {
        self.params().restore(state);
    }

    /// Samples on which the solver fell back to its last valid state.
    fn solver_fallbacks(&self) -> u64 {
        0
    }
}
