//! Chain state and model tuning files for tonegraph.
//!
//! - [`ChainState`](tonegraph_core::ChainState) as JSON: what
//!   [`ProcessorChain::to_state`](tonegraph_core::ProcessorChain::to_state)
//!   writes and `load_state` reads.
//! - [`ModelTuning`](tonegraph_models::ModelTuning) as TOML: oversampling
//!   thresholds, solver limits and pre-roll bounds for every model.
//!
//! # Example
//!
//! ```rust,no_run
//! use tonegraph_config::{load_chain_state, load_tuning};
//! use tonegraph_core::{ChainConfig, ProcessorChain};
//! use tonegraph_registry::ProcessorRegistry;
//!
//! let registry = ProcessorRegistry::with_tuning(load_tuning("tuning.toml")?);
//! let state = load_chain_state("chain.json")?;
//!
//! let (mut chain, _renderer) = ProcessorChain::new(ChainConfig::default());
//! let report = chain.load_state(&state, &registry)?;
//! for d in &report.diagnostics {
//!     eprintln!("{d}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
mod fs;
pub mod paths;
pub mod state;
pub mod tuning;

pub use error::ConfigError;
pub use paths::{default_tuning_path, find_chain, load_default_tuning, user_config_dir};
pub use state::{chain_state_from_json, chain_state_to_json, load_chain_state, save_chain_state};
pub use tuning::{load_tuning, save_tuning, tuning_from_toml, tuning_to_toml};
