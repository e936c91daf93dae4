//! Errors and diagnostics reported by chain mutations.
//!
//! Everything here is produced on the control thread and returned to the
//! caller synchronously. The audio thread never produces errors.

use crate::port::{PortDirection, PortError};

use super::node::NodeId;
use super::state::ConnectionDescriptor;

/// Errors returned by topology mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A port index does not exist on the node, or faces the wrong way.
    InvalidPort {
        /// Node the port was looked up on.
        node: NodeId,
        /// Direction that was expected.
        direction: PortDirection,
        /// Requested index.
        index: usize,
    },
    /// The destination port already has a feed.
    DuplicateConnection(ConnectionDescriptor),
    /// No such connection exists.
    ConnectionNotFound(ConnectionDescriptor),
    /// The node id is not a member of this chain.
    UnknownNode(NodeId),
    /// Input and Output cannot be removed or replaced.
    ProtectedNode(NodeId),
    /// The connection would close a loop.
    CycleDetected(ConnectionDescriptor),
    /// No registered processor has this type identifier.
    UnknownProcessorType(String),
    /// Every renderer slot is in use.
    ChainFull {
        /// Slot capacity of the chain.
        capacity: usize,
    },
    /// The renderer has not drained earlier updates yet.
    UpdateQueueFull,
    /// The processor declared an unusable port layout.
    InvalidLayout(PortError),
}

impl core::fmt::Display for ChainError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPort {
                node,
                direction,
                index,
            } => write!(f, "{node} has no {direction:?} port {index}"),
            Self::DuplicateConnection(c) => {
                write!(f, "input port {} of {} is already connected", c.dest_port, c.dest)
            }
            Self::ConnectionNotFound(c) => write!(f, "connection {c} not found"),
            Self::UnknownNode(id) => write!(f, "{id} is not part of this chain"),
            Self::ProtectedNode(id) => write!(f, "{id} is a chain boundary and cannot be changed"),
            Self::CycleDetected(c) => write!(f, "connection {c} would create a cycle"),
            Self::UnknownProcessorType(t) => write!(f, "unknown processor type '{t}'"),
            Self::ChainFull { capacity } => write!(f, "chain is full ({capacity} nodes)"),
            Self::UpdateQueueFull => write!(f, "renderer has not consumed pending updates"),
            Self::InvalidLayout(e) => write!(f, "invalid port layout: {e}"),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLayout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PortError> for ChainError {
    fn from(e: PortError) -> Self {
        Self::InvalidLayout(e)
    }
}

/// A connection removed by [`replace_node`](super::ProcessorChain::replace_node)
/// because the replacement lacks one of its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionDropped {
    /// The connection that no longer exists.
    pub connection: ConnectionDescriptor,
    /// Which end lost its port.
    pub missing: PortDirection,
}

impl core::fmt::Display for ConnectionDropped {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "dropped {} (replacement has no matching {:?} port)",
            self.connection, self.missing
        )
    }
}

/// A recoverable problem met while loading saved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDiagnostic {
    /// The node was skipped because its type is not registered.
    UnknownProcessorType {
        /// Saved id of the skipped node.
        node_id: NodeId,
        /// Unregistered type identifier.
        node_type: String,
    },
    /// The node was skipped because the chain could not take it.
    NodeRejected {
        /// Saved id of the skipped node.
        node_id: NodeId,
        /// Why it was rejected.
        error: ChainError,
    },
    /// The connection was skipped.
    ConnectionRejected {
        /// Connection as saved.
        connection: ConnectionDescriptor,
        /// Why it was rejected.
        error: ChainError,
    },
}

impl core::fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownProcessorType { node_id, node_type } => {
                write!(f, "skipped {node_id}: unknown processor type '{node_type}'")
            }
            Self::NodeRejected { node_id, error } => write!(f, "skipped {node_id}: {error}"),
            Self::ConnectionRejected { connection, error } => {
                write!(f, "skipped connection {connection}: {error}")
            }
        }
    }
}

/// Outcome of a best-effort state load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nodes created (boundary nodes excluded).
    pub nodes_loaded: usize,
    /// Connections restored.
    pub connections_loaded: usize,
    /// Everything that was skipped, in load order.
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    /// True when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
