//! tonegraph models: circuit models that plug into a tonegraph chain.
//!
//! - [`DiodeClipper`]: RC lowpass into an antiparallel diode pair, solved in
//!   closed form as a wave digital filter ([`wdf`])
//! - [`CryBaby`]: resonant wah solved with the nodal-DK method and a scalar
//!   Newton–Raphson kernel ([`dk`])
//!
//! Both implement [`tonegraph_core::Processor`]. Oversampling thresholds,
//! solver limits and the pre-roll bound come from [`ModelTuning`].
//!
//! ## Example
//!
//! ```rust
//! use tonegraph_core::Processor;
//! use tonegraph_models::{CryBaby, ModelTuning};
//!
//! let tuning = ModelTuning::default();
//! let mut wah = CryBaby::with_tuning(tuning.cry_baby);
//! wah.params().set("control_freq", 0.8);
//! wah.prepare(48000.0, 256);
//!
//! let mut left = vec![0.1f32; 256];
//! let mut right = vec![0.1f32; 256];
//! wah.process_audio(&mut left, &mut right);
//! assert_eq!(wah.solver_fallbacks(), 0);
//! ```

pub mod cry_baby;
pub mod diode_clipper;
pub mod dk;
pub mod tuning;
pub mod wdf;

pub use cry_baby::CryBaby;
pub use diode_clipper::DiodeClipper;
pub use dk::{SolverSettings, WahCircuit, WahComponents};
pub use tuning::{ClipperTuning, ModelTuning, WahTuning};
pub use wdf::{DiodeClipperWdf, DiodeType};
