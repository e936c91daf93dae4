//! tonegraph core: processing graph and node contract for circuit-model effects.
//!
//! This crate holds everything a circuit model needs in order to run inside a
//! live, reconfigurable chain, without depending on any particular model.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`chain::ProcessorChain`]: control-side topology manager (connect,
//!   disconnect, add, remove, replace, save and load state)
//! - [`chain::ChainRenderer`]: audio-side owner of the processors, fed by
//!   atomic topology updates
//! - [`Port`], [`PortLayout`]: typed audio/control endpoints
//!
//! ## Nodes
//!
//! - [`Processor`]: the uniform contract every node implements
//! - [`ParamSet`]: lock-free parameter store shared between threads
//! - [`OptionsHandle`]: observable node metadata with scoped [`Subscription`]s
//!
//! ## DSP building blocks
//!
//! - [`ParamSmoother`]: linear ramps with a potentiometer taper mapping
//! - [`RampedGain`]: click-free gain staging around nonlinearities
//! - [`Oversampler`]: polyphase IIR half-band up/down sampling
//! - [`DcBlocker`]: one-pole DC removal
//! - [`LevelMeter`]: lock-free stereo level snapshots
//!
//! # Real-time rules
//!
//! Everything reachable from [`chain::ChainRenderer::process`] is free of
//! allocation, locking and blocking. Allocation happens in `prepare` calls and
//! on the control thread.
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::chain::{ChainConfig, ConnectionDescriptor, ProcessorChain};
//!
//! let (mut chain, mut renderer) = ProcessorChain::new(ChainConfig {
//!     max_nodes: 8,
//!     sample_rate: 44100.0,
//!     block_size: 128,
//! });
//! chain
//!     .connect(ConnectionDescriptor::main(chain.input_id(), chain.output_id()))
//!     .unwrap();
//!
//! let mut left = vec![0.5f32; 300];
//! let mut right = vec![0.5f32; 300];
//! renderer.process(&mut left, &mut right);
//! assert_eq!(chain.output_meter().snapshot(), [0.5, 0.5]);
//! ```

pub mod chain;
pub mod dc_blocker;
pub mod gain;
pub mod meter;
pub mod options;
pub mod oversample;
pub mod param;
pub mod port;
pub mod processor;
pub mod smoother;

pub use chain::{
    ChainConfig, ChainError, ChainRenderer, ChainState, ConnectionDescriptor, NodeId,
    ProcessorChain, ProcessorFactory,
};
pub use dc_blocker::DcBlocker;
pub use gain::{RampedGain, drive_gains, drive_output_gain};
pub use meter::{LevelMeter, METER_CHANNELS, block_peak};
pub use options::{OptionsHandle, ProcessorOptions, Subscription};
pub use oversample::{Oversampler, OversamplingPolicy, OversamplingRatio};
pub use param::{
    AtomicParam, ON_OFF, ON_OFF_ID, ParamDescriptor, ParamKind, ParamScale, ParamSet,
    ParamSnapshot, Params,
};
pub use port::{Port, PortDescriptor, PortDirection, PortError, PortLayout, SignalKind};
pub use processor::{Processor, ProcessorCategory};
pub use smoother::{MappingFn, ParamSmoother};
