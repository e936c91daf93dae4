//! Node identity and the control-side record the chain keeps for each node.
//!
//! The processor itself lives on the audio thread once added. [`NodeEntry`]
//! is what stays behind on the control side: ports, parameter handle, options
//! handle and the connection hooks, all captured when the node was added.

use crate::options::OptionsHandle;
use crate::param::Params;
use crate::port::{Port, PortDirection, PortError};
use crate::processor::{Processor, ProcessorCategory};

/// Identifier of a node within one chain.
///
/// Ids are assigned sequentially and never reused within a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Builds an id from its raw value, e.g. when reading saved state.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// What a node is to the chain. Fixed when the node is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// The chain's audio entry point.
    Input,
    /// The chain's audio exit point.
    Output,
    /// A processing node that can be removed or replaced.
    Processor,
}

impl NodeRole {
    /// Input and Output are permanent.
    pub fn is_boundary(self) -> bool {
        !matches!(self, Self::Processor)
    }

    /// Sort key putting Input first and Output last.
    pub(crate) fn order_rank(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Processor => 1,
            Self::Output => 2,
        }
    }
}

/// Control-side record of one node.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    id: NodeId,
    role: NodeRole,
    slot: usize,
    processor_type: &'static str,
    name: &'static str,
    category: ProcessorCategory,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    params: Params,
    options: OptionsHandle,
    disable_on_connect: Vec<&'static [&'static str]>,
    enable_on_connect: Vec<&'static [&'static str]>,
}

impl NodeEntry {
    /// Captures everything the control side needs from `processor`.
    pub(crate) fn capture(
        id: NodeId,
        role: NodeRole,
        slot: usize,
        processor: &dyn Processor,
    ) -> Result<Self, PortError> {
        let layout = processor.port_layout();
        let (inputs, outputs) = layout.instantiate(id)?;
        let disable_on_connect = (0..inputs.len())
            .map(|p| processor.parameters_to_disable_when_input_connected(p))
            .collect();
        let enable_on_connect = (0..inputs.len())
            .map(|p| processor.parameters_to_enable_when_input_connected(p))
            .collect();
        Ok(Self {
            id,
            role,
            slot,
            processor_type: processor.processor_type(),
            name: processor.name(),
            category: processor.category(),
            inputs,
            outputs,
            params: std::sync::Arc::clone(processor.params()),
            options: processor.options().clone(),
            disable_on_connect,
            enable_on_connect,
        })
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Boundary tag.
    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Whether this is the chain's Input or Output node.
    pub fn is_boundary(&self) -> bool {
        self.role.is_boundary()
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    /// Registry identifier of the processor.
    pub fn processor_type(&self) -> &'static str {
        self.processor_type
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Processor category.
    pub fn category(&self) -> ProcessorCategory {
        self.category
    }

    /// Input ports.
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports.
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Port by direction and index.
    pub fn port(&self, direction: PortDirection, index: usize) -> Option<&Port> {
        match direction {
            PortDirection::Input => self.inputs.get(index),
            PortDirection::Output => self.outputs.get(index),
        }
    }

    pub(crate) fn port_mut(&mut self, direction: PortDirection, index: usize) -> Option<&mut Port> {
        match direction {
            PortDirection::Input => self.inputs.get_mut(index),
            PortDirection::Output => self.outputs.get_mut(index),
        }
    }

    /// Parameter handle shared with the processor.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Options handle shared with the processor.
    pub fn options(&self) -> &OptionsHandle {
        &self.options
    }

    /// Applies the processor's enable/disable-on-connection declarations for
    /// input `port` and publishes the result through the options handle.
    pub(crate) fn apply_connection_hook(&self, port: usize, connected: bool) {
        let disable = self.disable_on_connect.get(port).copied().unwrap_or(&[]);
        let enable = self.enable_on_connect.get(port).copied().unwrap_or(&[]);
        if disable.is_empty() && enable.is_empty() {
            return;
        }
        for id in disable {
            self.params.set_enabled(id, !connected);
        }
        for id in enable {
            self.params.set_enabled(id, connected);
        }
        let disabled: Vec<String> = self
            .params
            .disabled_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.options.update(|o| o.disabled_params = disabled);
    }
}
