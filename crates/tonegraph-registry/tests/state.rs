//! Saved chains of registered processors reload unchanged.

use proptest::prelude::*;
use tonegraph_core::chain::{ChainConfig, ConnectionDescriptor, NodeId};
use tonegraph_core::{ChainRenderer, ProcessorChain};
use tonegraph_registry::ProcessorRegistry;

fn chain() -> (ProcessorChain, ChainRenderer) {
    ProcessorChain::new(ChainConfig {
        max_nodes: 8,
        sample_rate: 48000.0,
        block_size: 128,
    })
}

/// Picks of (registry index, normalized parameter values), plus a wiring
/// order that is usually not the order the nodes were added in.
fn picks() -> impl Strategy<Value = (Vec<(usize, Vec<f32>)>, Vec<usize>)> {
    let count = ProcessorRegistry::new().len();
    (1usize..5).prop_flat_map(move |n| {
        (
            prop::collection::vec(
                (0..count, prop::collection::vec(0.0f32..=1.0, 8)),
                n,
            ),
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn saved_chain_reloads_unchanged((nodes, wiring) in picks()) {
        let registry = ProcessorRegistry::new();
        let types: Vec<&str> = registry.all().iter().map(|d| d.id).collect();

        let (mut chain, _r) = chain();
        let mut ids: Vec<NodeId> = Vec::new();
        for (pick, values) in &nodes {
            let type_id = types[*pick];
            let id = chain.add_node_of_type(type_id, &registry).unwrap();
            let descriptors = registry.param_descriptors(type_id).unwrap();
            for (d, t) in descriptors.iter().zip(values) {
                prop_assert!(chain.set_param(id, d.id, d.from_normalized(*t)).unwrap());
            }
            ids.push(id);
        }
        let mut previous = chain.input_id();
        for &w in &wiring {
            chain.connect(ConnectionDescriptor::main(previous, ids[w])).unwrap();
            previous = ids[w];
        }
        let output = chain.output_id();
        chain.connect(ConnectionDescriptor::main(previous, output)).unwrap();
        let state = chain.to_state();

        let (mut restored, _r) = self::chain();
        let report = restored.load_state(&state, &registry).unwrap();
        prop_assert!(report.is_clean(), "{:?}", report.diagnostics);
        prop_assert_eq!(report.nodes_loaded, nodes.len());
        prop_assert_eq!(report.connections_loaded, nodes.len() + 1);
        for (id, (pick, _)) in ids.iter().zip(&nodes) {
            prop_assert_eq!(restored.node(*id).unwrap().processor_type(), types[*pick]);
        }
        prop_assert_eq!(restored.to_state(), state);
    }
}
