//! Processing-order computation and reachability queries.
//!
//! Both functions work on the control side's connection set. The order is a
//! Kahn topological sort whose ready set is a min-heap keyed on
//! `(role rank, node id)`: among the nodes whose feeds are all computed,
//! Input goes first, Output goes last, and processors go in id order. That
//! makes the order deterministic and puts the boundary nodes at the ends
//! whenever the graph allows it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use super::node::{NodeEntry, NodeId};
use super::state::ConnectionDescriptor;

/// Topological processing order over `nodes`.
///
/// Connections are acyclic by construction (`connect` rejects cycles), so
/// every node appears exactly once.
pub(crate) fn processing_order(
    nodes: &BTreeMap<NodeId, NodeEntry>,
    connections: &BTreeSet<ConnectionDescriptor>,
) -> Vec<NodeId> {
    let mut in_degree: BTreeMap<NodeId, usize> = nodes.keys().map(|&id| (id, 0)).collect();
    let mut downstream: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();

    for c in connections {
        if let Some(d) = in_degree.get_mut(&c.dest) {
            *d += 1;
        }
        downstream.entry(c.source).or_default().push(c.dest);
    }

    let key = |id: NodeId| Reverse((nodes[&id].role().order_rank(), id));
    let mut ready: BinaryHeap<Reverse<(u8, NodeId)>> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| key(id))
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        sorted.push(id);
        for next in downstream.get(&id).into_iter().flatten() {
            if let Some(d) = in_degree.get_mut(next) {
                *d -= 1;
                if *d == 0 {
                    ready.push(key(*next));
                }
            }
        }
    }

    debug_assert_eq!(sorted.len(), nodes.len(), "connection graph has a cycle");
    sorted
}

/// Whether a directed path leads from `from` to `to` (inclusive of `from == to`).
pub(crate) fn can_reach(
    connections: &BTreeSet<ConnectionDescriptor>,
    from: NodeId,
    to: NodeId,
) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(
            connections
                .iter()
                .filter(|c| c.source == current)
                .map(|c| c.dest),
        );
    }
    false
}
