//! Graph topology manager for a chain of processors.
//!
//! A chain is split in two halves that live on different threads:
//!
//! - [`ProcessorChain`]: owned by the control thread. Holds node records,
//!   connections and the processing order. Validates and applies every
//!   mutation (connect, disconnect, add, remove, replace, state load).
//! - [`ChainRenderer`]: owned by the audio thread. Holds the processor
//!   instances, one stereo buffer per node and the render plan it is
//!   currently walking.
//!
//! # Publishing
//!
//! Mutations never touch live audio-side objects. Each successful mutation
//! builds a fresh immutable [`ChainSnapshot`] and sends it, together with any
//! processors to install or retire, as a single update over a bounded
//! lock-free channel. The renderer applies updates only at block boundaries,
//! so it renders either the whole old graph or the whole new one. Processors
//! it lets go of travel back on a second channel and are dropped on the
//! control thread.
//!
//! # Processing order
//!
//! Kahn's topological sort with Input first, Output last and ties broken by
//! node id. Cycles cannot form: `connect` rejects any edge whose destination
//! already reaches its source.
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::chain::{ChainConfig, ConnectionDescriptor, ProcessorChain};
//!
//! let (mut chain, _renderer) = ProcessorChain::new(ChainConfig::default());
//! let input = chain.input_id();
//! let output = chain.output_id();
//!
//! chain.connect(ConnectionDescriptor::main(input, output))?;
//! assert!(chain.connect(ConnectionDescriptor::main(input, output)).is_err());
//! chain.disconnect(ConnectionDescriptor::main(input, output))?;
//! assert_eq!(chain.connections().count(), 0);
//! # Ok::<(), tonegraph_core::chain::ChainError>(())
//! ```

mod boundary;
mod buffer;
mod error;
mod factory;
mod node;
mod order;
mod processor_chain;
mod renderer;
mod snapshot;
mod state;

pub use boundary::{INPUT_TYPE, OUTPUT_TYPE};
pub use error::{ChainError, ConnectionDropped, LoadDiagnostic, LoadReport};
pub use factory::ProcessorFactory;
pub use node::{NodeEntry, NodeId, NodeRole};
pub use processor_chain::{ChainConfig, ProcessorChain, UPDATE_QUEUE_CAPACITY};
pub use renderer::ChainRenderer;
pub use snapshot::{ChainSnapshot, RenderStep, SnapshotReader};
pub use state::{ChainState, ConnectionDescriptor, NodeState};
