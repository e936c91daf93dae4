//! Typed audio/control endpoints on a processor node.
//!
//! Every processor declares a [`PortLayout`]: an ordered list of input and
//! output [`PortDescriptor`]s. When a processor joins a chain, the chain turns
//! that layout into concrete [`Port`]s owned by the node. A port's direction
//! and signal kind never change after construction; only its connected flag
//! moves, and the chain is the one that moves it.
//!
//! Port indices are positional within their direction: input port 1 and output
//! port 1 are different ports.

use crate::chain::NodeId;

/// Direction of data flow through a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortDirection {
    /// Receives data from an upstream node.
    Input,
    /// Emits data to downstream nodes.
    Output,
}

/// The kind of signal a port carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalKind {
    /// Stereo audio, processed in place by the node.
    Audio,
    /// Mono modulation signal read once per block by the node.
    Control,
}

/// Static declaration of one port, as reported by a processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Short human-readable name ("in", "freq mod").
    pub name: &'static str,
    /// Data-flow direction.
    pub direction: PortDirection,
    /// Signal kind.
    pub kind: SignalKind,
}

impl PortDescriptor {
    /// Audio input port.
    pub const fn audio_in(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind: SignalKind::Audio,
        }
    }

    /// Audio output port.
    pub const fn audio_out(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            kind: SignalKind::Audio,
        }
    }

    /// Control input port.
    pub const fn control_in(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind: SignalKind::Control,
        }
    }
}

/// Reasons a port cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// Nodes only emit audio; control outputs do not exist.
    ControlOutput {
        /// Position of the offending descriptor.
        index: usize,
    },
    /// A descriptor was listed under the wrong direction in a layout.
    DirectionMismatch {
        /// Position of the offending descriptor.
        index: usize,
        /// Direction the layout slot expects.
        expected: PortDirection,
    },
}

impl core::fmt::Display for PortError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ControlOutput { index } => {
                write!(f, "output port {index} cannot carry a control signal")
            }
            Self::DirectionMismatch { index, expected } => {
                write!(f, "port {index} must be declared as {expected:?}")
            }
        }
    }
}

impl std::error::Error for PortError {}

/// A concrete port owned by one node in a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    index: usize,
    direction: PortDirection,
    kind: SignalKind,
    owner: NodeId,
    connected: bool,
}

impl Port {
    /// Creates a disconnected port from its descriptor.
    ///
    /// Fails for a control-kind output, the one combination nodes cannot emit.
    pub fn new(owner: NodeId, index: usize, descriptor: PortDescriptor) -> Result<Self, PortError> {
        if descriptor.direction == PortDirection::Output && descriptor.kind == SignalKind::Control
        {
            return Err(PortError::ControlOutput { index });
        }
        Ok(Self {
            index,
            direction: descriptor.direction,
            kind: descriptor.kind,
            owner,
            connected: false,
        })
    }

    /// Position of the port among the owner's ports of the same direction.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Data-flow direction.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Signal kind.
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Node that owns this port.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Whether at least one connection touches this port.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Updates the connection flag. Has no effect on routing.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

/// Ordered port declarations of a processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortLayout {
    /// Input ports, in index order.
    pub inputs: &'static [PortDescriptor],
    /// Output ports, in index order.
    pub outputs: &'static [PortDescriptor],
}

const MONO_IN: &[PortDescriptor] = &[PortDescriptor::audio_in("in")];
const MONO_OUT: &[PortDescriptor] = &[PortDescriptor::audio_out("out")];

impl PortLayout {
    /// One audio input, one audio output.
    pub const fn mono_effect() -> Self {
        Self {
            inputs: MONO_IN,
            outputs: MONO_OUT,
        }
    }

    /// Output only. Used by the chain's Input boundary node.
    pub const fn source() -> Self {
        Self {
            inputs: &[],
            outputs: MONO_OUT,
        }
    }

    /// Input only. Used by the chain's Output boundary node.
    pub const fn sink() -> Self {
        Self {
            inputs: MONO_IN,
            outputs: &[],
        }
    }

    /// Builds the owned ports for a node, inputs then outputs.
    pub fn instantiate(&self, owner: NodeId) -> Result<(Vec<Port>, Vec<Port>), PortError> {
        let inputs = Self::build(owner, self.inputs, PortDirection::Input)?;
        let outputs = Self::build(owner, self.outputs, PortDirection::Output)?;
        Ok((inputs, outputs))
    }

    fn build(
        owner: NodeId,
        descriptors: &[PortDescriptor],
        expected: PortDirection,
    ) -> Result<Vec<Port>, PortError> {
        descriptors
            .iter()
            .enumerate()
            .map(|(index, desc)| {
                if desc.direction != expected {
                    return Err(PortError::DirectionMismatch { index, expected });
                }
                Port::new(owner, index, *desc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_starts_disconnected() {
        let port = Port::new(NodeId(3), 0, PortDescriptor::audio_in("in")).unwrap();
        assert_eq!(port.owner(), NodeId(3));
        assert_eq!(port.direction(), PortDirection::Input);
        assert_eq!(port.kind(), SignalKind::Audio);
        assert!(!port.is_connected());
    }

    #[test]
    fn set_connected_only_moves_the_flag() {
        let mut port = Port::new(NodeId(1), 2, PortDescriptor::control_in("mod")).unwrap();
        port.set_connected(true);
        assert!(port.is_connected());
        assert_eq!(port.index(), 2);
        assert_eq!(port.kind(), SignalKind::Control);
        port.set_connected(false);
        assert!(!port.is_connected());
    }

    #[test]
    fn control_output_is_rejected() {
        let desc = PortDescriptor {
            name: "cv",
            direction: PortDirection::Output,
            kind: SignalKind::Control,
        };
        assert_eq!(
            Port::new(NodeId(0), 4, desc),
            Err(PortError::ControlOutput { index: 4 })
        );
    }

    #[test]
    fn layout_rejects_misfiled_descriptor() {
        static BAD: &[PortDescriptor] = &[PortDescriptor::audio_out("oops")];
        let layout = PortLayout {
            inputs: BAD,
            outputs: &[],
        };
        assert!(matches!(
            layout.instantiate(NodeId(0)),
            Err(PortError::DirectionMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn boundary_layouts() {
        let (ins, outs) = PortLayout::source().instantiate(NodeId(0)).unwrap();
        assert!(ins.is_empty());
        assert_eq!(outs.len(), 1);
        let (ins, outs) = PortLayout::sink().instantiate(NodeId(1)).unwrap();
        assert_eq!(ins.len(), 1);
        assert!(outs.is_empty());
    }
}
