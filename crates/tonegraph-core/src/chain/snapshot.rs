//! Immutable render plans published by the control side.
//!
//! A [`ChainSnapshot`] is everything the renderer needs to walk one version of
//! the graph: the processing order, and for each node the buffer slots that
//! feed it. Snapshots are never edited. Each topology mutation builds a new one
//! and publishes it as a whole.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::port::SignalKind;

use super::node::{NodeEntry, NodeId, NodeRole};
use super::state::ConnectionDescriptor;

/// One node's entry in the render plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStep {
    /// Node being rendered.
    pub node: NodeId,
    /// Boundary tag of the node.
    pub role: NodeRole,
    /// Renderer slot holding the node and its output buffer.
    pub slot: usize,
    /// Slots summed into the node's audio input.
    pub audio_sources: Vec<usize>,
    /// `(control port, source slot)` feeds delivered before processing.
    pub control_sources: Vec<(usize, usize)>,
}

/// A complete, consistent render plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSnapshot {
    generation: u64,
    steps: Vec<RenderStep>,
    input_slot: usize,
    output_slot: usize,
}

impl ChainSnapshot {
    /// Builds the plan for `order` over the given topology.
    pub(crate) fn build(
        generation: u64,
        order: &[NodeId],
        nodes: &BTreeMap<NodeId, NodeEntry>,
        connections: &BTreeSet<ConnectionDescriptor>,
    ) -> Self {
        let mut input_slot = 0;
        let mut output_slot = 0;
        let steps = order
            .iter()
            .filter_map(|id| nodes.get(id))
            .map(|entry| {
                match entry.role() {
                    NodeRole::Input => input_slot = entry.slot(),
                    NodeRole::Output => output_slot = entry.slot(),
                    NodeRole::Processor => {}
                }
                let mut audio_sources = Vec::new();
                let mut control_sources = Vec::new();
                for c in connections.iter().filter(|c| c.dest == entry.id()) {
                    let (Some(src), Some(port)) = (nodes.get(&c.source), entry.inputs().get(c.dest_port))
                    else {
                        continue;
                    };
                    match port.kind() {
                        SignalKind::Audio => audio_sources.push(src.slot()),
                        SignalKind::Control => control_sources.push((c.dest_port, src.slot())),
                    }
                }
                RenderStep {
                    node: entry.id(),
                    role: entry.role(),
                    slot: entry.slot(),
                    audio_sources,
                    control_sources,
                }
            })
            .collect();

        Self {
            generation,
            steps,
            input_slot,
            output_slot,
        }
    }

    /// Publish counter. Increases by one per topology update.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Render steps in processing order.
    pub fn steps(&self) -> &[RenderStep] {
        &self.steps
    }

    /// Node ids in processing order.
    pub fn order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.steps.iter().map(|s| s.node)
    }

    /// Slot of the Input node.
    pub fn input_slot(&self) -> usize {
        self.input_slot
    }

    /// Slot of the Output node.
    pub fn output_slot(&self) -> usize {
        self.output_slot
    }

    /// Slot of `node`, if it is part of this plan.
    pub fn slot_of(&self, node: NodeId) -> Option<usize> {
        self.steps.iter().find(|s| s.node == node).map(|s| s.slot)
    }
}

/// Wait-free read handle on the most recently published snapshot.
///
/// Clone it into monitoring or editor threads. It always yields a complete
/// snapshot: either the one before a mutation or the one after.
#[derive(Clone)]
pub struct SnapshotReader {
    published: Arc<ArcSwap<ChainSnapshot>>,
}

impl SnapshotReader {
    pub(crate) fn new(published: Arc<ArcSwap<ChainSnapshot>>) -> Self {
        Self { published }
    }

    /// The latest published snapshot.
    pub fn load(&self) -> Arc<ChainSnapshot> {
        self.published.load_full()
    }

    /// Generation of the latest published snapshot.
    pub fn generation(&self) -> u64 {
        self.published.load().generation()
    }
}

impl core::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("generation", &self.generation())
            .finish()
    }
}
