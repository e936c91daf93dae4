//! Wire types shared by the connection API and persisted chain state.

use crate::param::ParamSnapshot;

use super::node::NodeId;

/// One connection: an output port of `source` feeding an input port of `dest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionDescriptor {
    /// Node that emits the signal.
    pub source: NodeId,
    /// Output port index on `source`.
    pub source_port: usize,
    /// Node that receives the signal.
    pub dest: NodeId,
    /// Input port index on `dest`.
    pub dest_port: usize,
}

impl ConnectionDescriptor {
    /// Builds a descriptor.
    pub const fn new(source: NodeId, source_port: usize, dest: NodeId, dest_port: usize) -> Self {
        Self {
            source,
            source_port,
            dest,
            dest_port,
        }
    }

    /// Port 0 of `source` into port 0 of `dest`.
    pub const fn main(source: NodeId, dest: NodeId) -> Self {
        Self::new(source, 0, dest, 0)
    }

    /// Whether either end is `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.dest == node
    }
}

impl core::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}:{} → {}:{}",
            self.source, self.source_port, self.dest, self.dest_port
        )
    }
}

/// Persisted form of one node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeState {
    /// Registry identifier of the processor.
    pub node_type: String,
    /// Id the node had when saved. Connections refer to it.
    pub node_id: NodeId,
    /// Parameter values.
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: ParamSnapshot,
}

/// Persisted form of a whole chain.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainState {
    /// Nodes in processing order, boundary nodes included.
    pub nodes: Vec<NodeState>,
    /// Every connection, sorted.
    #[cfg_attr(feature = "serde", serde(default))]
    pub connections: Vec<ConnectionDescriptor>,
}
