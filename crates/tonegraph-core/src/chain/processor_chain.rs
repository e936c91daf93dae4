//! Control-side half of a chain: topology, validation and publishing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::meter::LevelMeter;
use crate::options::OptionsHandle;
use crate::param::Params;
use crate::port::PortDirection;
use crate::processor::Processor;

use super::boundary::{BoundaryNode, INPUT_TYPE, OUTPUT_TYPE};
use super::error::{ChainError, ConnectionDropped, LoadDiagnostic, LoadReport};
use super::factory::ProcessorFactory;
use super::node::{NodeEntry, NodeId, NodeRole};
use super::order::{can_reach, processing_order};
use super::renderer::{ChainRenderer, ChainUpdate, SharedSpec};
use super::snapshot::{ChainSnapshot, SnapshotReader};
use super::state::{ChainState, ConnectionDescriptor, NodeState};

/// Updates that may be in flight before mutations start failing with
/// [`ChainError::UpdateQueueFull`].
pub const UPDATE_QUEUE_CAPACITY: usize = 256;

const INPUT_SLOT: usize = 0;
const OUTPUT_SLOT: usize = 1;
const BOUNDARY_SLOTS: usize = 2;

/// Construction parameters for a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainConfig {
    /// Maximum number of processors, boundary nodes excluded.
    pub max_nodes: usize,
    /// Initial session sample rate in Hz.
    pub sample_rate: f32,
    /// Initial maximum block size in samples.
    pub block_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_nodes: 64,
            sample_rate: 48000.0,
            block_size: 512,
        }
    }
}

#[derive(Default)]
struct Pending {
    retires: Vec<usize>,
    installs: Vec<(usize, Box<dyn Processor>)>,
}

/// Topology manager for one chain of processors.
///
/// Owns the node records, the connection set and the derived processing
/// order. Every successful mutation publishes exactly one update to the paired
/// [`ChainRenderer`]; a failed mutation publishes nothing and leaves the
/// topology untouched.
///
/// ```rust
/// use tonegraph_core::chain::{ChainConfig, ConnectionDescriptor, ProcessorChain};
///
/// let (mut chain, mut renderer) = ProcessorChain::new(ChainConfig::default());
/// let (input, output) = (chain.input_id(), chain.output_id());
/// chain.connect(ConnectionDescriptor::main(input, output)).unwrap();
///
/// let (mut l, mut r) = (vec![0.25f32; 64], vec![-0.25f32; 64]);
/// renderer.process(&mut l, &mut r);
/// assert_eq!(l[0], 0.25);
/// assert_eq!(chain.processing_order(), &[input, output]);
/// ```
pub struct ProcessorChain {
    nodes: BTreeMap<NodeId, NodeEntry>,
    connections: BTreeSet<ConnectionDescriptor>,
    order: Vec<NodeId>,
    slots: Vec<Option<NodeId>>,
    next_id: u32,
    input_id: NodeId,
    output_id: NodeId,
    generation: u64,
    pending: Pending,
    published: Arc<ArcSwap<ChainSnapshot>>,
    updates: Sender<ChainUpdate>,
    retired: Receiver<ChainUpdate>,
    spec: Arc<SharedSpec>,
    input_meter: Arc<LevelMeter>,
    output_meter: Arc<LevelMeter>,
}

impl ProcessorChain {
    /// Creates an empty chain (Input and Output only, unconnected) and its
    /// renderer.
    pub fn new(config: ChainConfig) -> (Self, ChainRenderer) {
        let (updates, update_rx) = crossbeam_channel::bounded(UPDATE_QUEUE_CAPACITY);
        let (retired_tx, retired) = crossbeam_channel::bounded(UPDATE_QUEUE_CAPACITY);
        let spec = Arc::new(SharedSpec::new(config.sample_rate, config.block_size.max(1)));
        let input_meter = Arc::new(LevelMeter::new());
        let output_meter = Arc::new(LevelMeter::new());

        let mut nodes = BTreeMap::new();
        let input_id = NodeId(0);
        let output_id = NodeId(1);
        for (id, role, slot, node) in [
            (input_id, NodeRole::Input, INPUT_SLOT, BoundaryNode::input()),
            (output_id, NodeRole::Output, OUTPUT_SLOT, BoundaryNode::output()),
        ] {
            if let Ok(entry) = NodeEntry::capture(id, role, slot, &node) {
                nodes.insert(id, entry);
            }
        }

        let connections = BTreeSet::new();
        let order = processing_order(&nodes, &connections);
        let snapshot = Arc::new(ChainSnapshot::build(0, &order, &nodes, &connections));
        let renderer = ChainRenderer::new(
            config.max_nodes + BOUNDARY_SLOTS,
            Arc::clone(&snapshot),
            update_rx,
            retired_tx,
            Arc::clone(&spec),
            Arc::clone(&input_meter),
            Arc::clone(&output_meter),
        );

        let chain = Self {
            nodes,
            connections,
            order,
            slots: vec![None; config.max_nodes],
            next_id: 2,
            input_id,
            output_id,
            generation: 0,
            pending: Pending::default(),
            published: Arc::new(ArcSwap::new(snapshot)),
            updates,
            retired,
            spec,
            input_meter,
            output_meter,
        };
        (chain, renderer)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Id of the permanent Input node.
    pub fn input_id(&self) -> NodeId {
        self.input_id
    }

    /// Id of the permanent Output node.
    pub fn output_id(&self) -> NodeId {
        self.output_id
    }

    /// Node ids in processing order. Input first, Output last.
    pub fn processing_order(&self) -> &[NodeId] {
        &self.order
    }

    /// All connections, sorted.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionDescriptor> + '_ {
        self.connections.iter()
    }

    /// Whether this exact connection exists.
    pub fn contains_connection(&self, connection: &ConnectionDescriptor) -> bool {
        self.connections.contains(connection)
    }

    /// All node ids, boundary nodes included, in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Control-side record of a node.
    pub fn node(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(&id)
    }

    /// Parameter handle of a node.
    pub fn params(&self, id: NodeId) -> Option<&Params> {
        self.nodes.get(&id).map(NodeEntry::params)
    }

    /// Options handle of a node.
    pub fn options(&self, id: NodeId) -> Option<&OptionsHandle> {
        self.nodes.get(&id).map(NodeEntry::options)
    }

    /// Sets one parameter. Returns false if the node has no such parameter.
    ///
    /// Parameters are atomics shared with the audio thread, so this needs no
    /// topology update.
    pub fn set_param(&self, id: NodeId, param: &str, value: f32) -> Result<bool, ChainError> {
        let entry = self.nodes.get(&id).ok_or(ChainError::UnknownNode(id))?;
        Ok(entry.params().set(param, value))
    }

    /// Number of processors, boundary nodes excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - BOUNDARY_SLOTS
    }

    /// True when only the boundary nodes are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of processors.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Sample rate and block size new nodes are prepared at.
    pub fn spec(&self) -> (f32, usize) {
        self.spec.load()
    }

    /// Levels of the audio entering the chain.
    pub fn input_meter(&self) -> Arc<LevelMeter> {
        Arc::clone(&self.input_meter)
    }

    /// Levels of the audio leaving the chain.
    pub fn output_meter(&self) -> Arc<LevelMeter> {
        Arc::clone(&self.output_meter)
    }

    /// The most recently published render plan.
    pub fn snapshot(&self) -> Arc<ChainSnapshot> {
        self.published.load_full()
    }

    /// A cloneable, thread-safe reader of published snapshots.
    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader::new(Arc::clone(&self.published))
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Connects an output port to an input port.
    ///
    /// On success both ports are marked connected and the destination's
    /// enable/disable-on-connection declarations are applied.
    pub fn connect(&mut self, connection: ConnectionDescriptor) -> Result<(), ChainError> {
        self.begin()?;
        self.connect_inner(connection)?;
        self.publish();
        #[cfg(feature = "tracing")]
        tracing::debug!(%connection, "connected");
        Ok(())
    }

    /// Removes a connection.
    pub fn disconnect(&mut self, connection: ConnectionDescriptor) -> Result<(), ChainError> {
        self.begin()?;
        if !self.connections.remove(&connection) {
            return Err(ChainError::ConnectionNotFound(connection));
        }
        self.after_disconnect(&connection);
        self.publish();
        #[cfg(feature = "tracing")]
        tracing::debug!(%connection, "disconnected");
        Ok(())
    }

    /// Adds a processor, unconnected.
    ///
    /// The processor is prepared at the chain's current sample rate and block
    /// size before it is handed to the renderer.
    pub fn add_node(&mut self, processor: Box<dyn Processor>) -> Result<NodeId, ChainError> {
        self.begin()?;
        let id = self.add_inner(processor, None)?;
        self.publish();
        #[cfg(feature = "tracing")]
        tracing::debug!(%id, "node added");
        Ok(id)
    }

    /// Builds a processor of `type_id` with `factory` and adds it.
    pub fn add_node_of_type(
        &mut self,
        type_id: &str,
        factory: &dyn ProcessorFactory,
    ) -> Result<NodeId, ChainError> {
        let processor = factory
            .create(type_id)
            .ok_or_else(|| ChainError::UnknownProcessorType(type_id.to_string()))?;
        self.add_node(processor)
    }

    /// Removes a processor together with every connection touching it.
    ///
    /// Returns the removed connections.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<ConnectionDescriptor>, ChainError> {
        self.begin()?;
        let removed = self.remove_inner(id)?;
        self.publish();
        #[cfg(feature = "tracing")]
        tracing::debug!(%id, connections = removed.len(), "node removed");
        Ok(removed)
    }

    /// Swaps the processor behind `id` for `replacement`, keeping the id.
    ///
    /// Connections whose port indices still exist survive. The others are
    /// dropped and reported; that is not an error.
    pub fn replace_node(
        &mut self,
        id: NodeId,
        replacement: Box<dyn Processor>,
    ) -> Result<Vec<ConnectionDropped>, ChainError> {
        self.begin()?;
        let old = self.nodes.get(&id).ok_or(ChainError::UnknownNode(id))?;
        if old.is_boundary() {
            return Err(ChainError::ProtectedNode(id));
        }
        let slot = old.slot();
        let entry = NodeEntry::capture(id, NodeRole::Processor, slot, replacement.as_ref())?;

        let mut dropped = Vec::new();
        for c in self.connections.iter().filter(|c| c.touches(id)) {
            if c.dest == id && c.dest_port >= entry.inputs().len() {
                dropped.push(ConnectionDropped {
                    connection: *c,
                    missing: PortDirection::Input,
                });
            } else if c.source == id && c.source_port >= entry.outputs().len() {
                dropped.push(ConnectionDropped {
                    connection: *c,
                    missing: PortDirection::Output,
                });
            }
        }
        for d in &dropped {
            self.connections.remove(&d.connection);
        }

        self.nodes.insert(id, entry);
        self.refresh_ports(id);
        for d in &dropped {
            self.after_disconnect(&d.connection);
        }
        let incoming: Vec<usize> = self
            .connections
            .iter()
            .filter(|c| c.dest == id)
            .map(|c| c.dest_port)
            .collect();
        if let Some(entry) = self.nodes.get(&id) {
            for port in incoming {
                entry.apply_connection_hook(port, true);
            }
        }

        let mut replacement = replacement;
        let (sample_rate, block_size) = self.spec.load();
        replacement.prepare(sample_rate, block_size);
        self.pending.installs.push((slot, replacement));
        self.publish();

        #[cfg(feature = "tracing")]
        for d in &dropped {
            tracing::warn!(%id, "{d}");
        }
        Ok(dropped)
    }

    /// Current topology and parameter values in persistable form.
    pub fn to_state(&self) -> ChainState {
        let nodes = self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|entry| NodeState {
                node_type: entry.processor_type().to_string(),
                node_id: entry.id(),
                params: entry.params().snapshot(),
            })
            .collect();
        ChainState {
            nodes,
            connections: self.connections.iter().copied().collect(),
        }
    }

    /// Replaces every processor and connection with those in `state`.
    ///
    /// Best effort: unknown processor types and invalid connections are
    /// skipped and reported in the returned [`LoadReport`]. A saved id is kept
    /// when it is free and handed a fresh one when it collides; the boundary
    /// entries map onto this chain's Input and Output. The whole load reaches
    /// the renderer as one update.
    pub fn load_state(
        &mut self,
        state: &ChainState,
        factory: &dyn ProcessorFactory,
    ) -> Result<LoadReport, ChainError> {
        self.begin()?;

        let existing: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|e| !e.is_boundary())
            .map(NodeEntry::id)
            .collect();
        for id in existing {
            self.remove_inner(id)?;
        }
        for c in std::mem::take(&mut self.connections) {
            self.after_disconnect(&c);
        }

        let mut report = LoadReport::default();
        let mut ids: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        for saved in &state.nodes {
            let boundary = match saved.node_type.as_str() {
                INPUT_TYPE => Some(self.input_id),
                OUTPUT_TYPE => Some(self.output_id),
                _ => None,
            };
            if let Some(id) = boundary {
                if let Some(entry) = self.nodes.get(&id) {
                    entry.params().restore(&saved.params);
                }
                ids.insert(saved.node_id, id);
                continue;
            }

            let Some(mut processor) = factory.create(&saved.node_type) else {
                report.diagnostics.push(LoadDiagnostic::UnknownProcessorType {
                    node_id: saved.node_id,
                    node_type: saved.node_type.clone(),
                });
                continue;
            };
            processor.from_state(&saved.params);
            let keep = Some(saved.node_id).filter(|id| self.id_is_free(*id));
            match self.add_inner(processor, keep) {
                Ok(id) => {
                    ids.entry(saved.node_id).or_insert(id);
                    report.nodes_loaded += 1;
                }
                Err(error) => report.diagnostics.push(LoadDiagnostic::NodeRejected {
                    node_id: saved.node_id,
                    error,
                }),
            }
        }

        for saved in &state.connections {
            let mapped = match (ids.get(&saved.source), ids.get(&saved.dest)) {
                (Some(&source), Some(&dest)) => Ok(ConnectionDescriptor::new(
                    source,
                    saved.source_port,
                    dest,
                    saved.dest_port,
                )),
                (None, _) => Err(ChainError::UnknownNode(saved.source)),
                (_, None) => Err(ChainError::UnknownNode(saved.dest)),
            };
            match mapped.and_then(|c| self.connect_inner(c)) {
                Ok(()) => report.connections_loaded += 1,
                Err(error) => report.diagnostics.push(LoadDiagnostic::ConnectionRejected {
                    connection: *saved,
                    error,
                }),
            }
        }

        self.publish();

        #[cfg(feature = "tracing")]
        {
            for diagnostic in &report.diagnostics {
                tracing::warn!("{diagnostic}");
            }
            tracing::debug!(
                nodes = report.nodes_loaded,
                connections = report.connections_loaded,
                "chain state loaded"
            );
        }
        Ok(report)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Frees what the renderer sent back and makes sure the next publish fits.
    fn begin(&mut self) -> Result<(), ChainError> {
        while let Ok(spent) = self.retired.try_recv() {
            drop(spent);
        }
        if self.updates.is_full() {
            return Err(ChainError::UpdateQueueFull);
        }
        Ok(())
    }

    fn connect_inner(&mut self, c: ConnectionDescriptor) -> Result<(), ChainError> {
        let source = self
            .nodes
            .get(&c.source)
            .ok_or(ChainError::UnknownNode(c.source))?;
        let dest = self
            .nodes
            .get(&c.dest)
            .ok_or(ChainError::UnknownNode(c.dest))?;

        if source.port(PortDirection::Output, c.source_port).is_none() {
            return Err(ChainError::InvalidPort {
                node: c.source,
                direction: PortDirection::Output,
                index: c.source_port,
            });
        }
        if dest.port(PortDirection::Input, c.dest_port).is_none() {
            return Err(ChainError::InvalidPort {
                node: c.dest,
                direction: PortDirection::Input,
                index: c.dest_port,
            });
        }
        if self
            .connections
            .iter()
            .any(|e| e.dest == c.dest && e.dest_port == c.dest_port)
        {
            return Err(ChainError::DuplicateConnection(c));
        }
        if c.source == c.dest || can_reach(&self.connections, c.dest, c.source) {
            return Err(ChainError::CycleDetected(c));
        }

        self.connections.insert(c);
        self.set_port_flag(c.source, PortDirection::Output, c.source_port);
        self.set_port_flag(c.dest, PortDirection::Input, c.dest_port);
        if let Some(dest) = self.nodes.get(&c.dest) {
            dest.apply_connection_hook(c.dest_port, true);
        }
        Ok(())
    }

    /// Whether a saved id can be reused as is.
    fn id_is_free(&self, id: NodeId) -> bool {
        id != self.input_id
            && id != self.output_id
            && id.0 != u32::MAX
            && !self.nodes.contains_key(&id)
    }

    /// Adds a processor under `keep`, or under the next fresh id.
    ///
    /// `next_id` always stays past every id handed out.
    fn add_inner(
        &mut self,
        mut processor: Box<dyn Processor>,
        keep: Option<NodeId>,
    ) -> Result<NodeId, ChainError> {
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ChainError::ChainFull {
                capacity: self.slots.len(),
            })?;
        let slot = free + BOUNDARY_SLOTS;
        let id = keep.unwrap_or(NodeId(self.next_id));
        let entry = NodeEntry::capture(id, NodeRole::Processor, slot, processor.as_ref())?;

        let (sample_rate, block_size) = self.spec.load();
        processor.prepare(sample_rate, block_size);

        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.slots[free] = Some(id);
        self.nodes.insert(id, entry);
        self.pending.installs.push((slot, processor));
        Ok(id)
    }

    fn remove_inner(&mut self, id: NodeId) -> Result<Vec<ConnectionDescriptor>, ChainError> {
        let entry = self.nodes.get(&id).ok_or(ChainError::UnknownNode(id))?;
        if entry.is_boundary() {
            return Err(ChainError::ProtectedNode(id));
        }
        let slot = entry.slot();

        let removed: Vec<ConnectionDescriptor> = self
            .connections
            .iter()
            .filter(|c| c.touches(id))
            .copied()
            .collect();
        for c in &removed {
            self.connections.remove(c);
        }
        self.nodes.remove(&id);
        for c in &removed {
            self.after_disconnect(c);
        }

        if let Some(free) = self.slots.get_mut(slot - BOUNDARY_SLOTS) {
            *free = None;
        }
        // a node added earlier in the same batch never reaches the renderer
        if let Some(pos) = self.pending.installs.iter().position(|(s, _)| *s == slot) {
            self.pending.installs.remove(pos);
        } else {
            self.pending.retires.push(slot);
        }
        Ok(removed)
    }

    /// Port flags and connection hooks after `c` left the connection set.
    fn after_disconnect(&mut self, c: &ConnectionDescriptor) {
        self.set_port_flag(c.source, PortDirection::Output, c.source_port);
        self.set_port_flag(c.dest, PortDirection::Input, c.dest_port);
        if let Some(dest) = self.nodes.get(&c.dest) {
            dest.apply_connection_hook(c.dest_port, false);
        }
    }

    fn set_port_flag(&mut self, id: NodeId, direction: PortDirection, index: usize) {
        let connected = self.connections.iter().any(|c| match direction {
            PortDirection::Output => c.source == id && c.source_port == index,
            PortDirection::Input => c.dest == id && c.dest_port == index,
        });
        if let Some(port) = self
            .nodes
            .get_mut(&id)
            .and_then(|e| e.port_mut(direction, index))
        {
            port.set_connected(connected);
        }
    }

    fn refresh_ports(&mut self, id: NodeId) {
        let Some(entry) = self.nodes.get(&id) else {
            return;
        };
        let (inputs, outputs) = (entry.inputs().len(), entry.outputs().len());
        for index in 0..inputs {
            self.set_port_flag(id, PortDirection::Input, index);
        }
        for index in 0..outputs {
            self.set_port_flag(id, PortDirection::Output, index);
        }
    }

    /// Recomputes the order and sends one update carrying everything pending.
    fn publish(&mut self) {
        self.order = processing_order(&self.nodes, &self.connections);
        self.generation += 1;
        let snapshot = Arc::new(ChainSnapshot::build(
            self.generation,
            &self.order,
            &self.nodes,
            &self.connections,
        ));
        self.published.store(Arc::clone(&snapshot));

        let pending = std::mem::take(&mut self.pending);
        let released = Vec::with_capacity(pending.retires.len() + pending.installs.len());
        let update = ChainUpdate {
            snapshot,
            prepared_at: self.spec.load(),
            retires: pending.retires,
            installs: pending.installs,
            released,
        };
        // `begin` guaranteed room, and this is the only sender
        match self.updates.try_send(update) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => debug_assert!(false, "update queue overflow"),
        }
    }
}

impl core::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("order", &self.order)
            .field("connections", &self.connections)
            .field("generation", &self.generation)
            .finish()
    }
}
