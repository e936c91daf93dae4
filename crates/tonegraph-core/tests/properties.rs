//! Property-based tests for chain topology and parameter smoothing.
//!
//! Random connect/disconnect/remove/replace sequences are applied to a chain
//! of stub processors, and the invariants that must hold in every stable
//! state are checked after each step.

use std::collections::BTreeSet;

use proptest::prelude::*;
use tonegraph_core::chain::{ChainConfig, ConnectionDescriptor, NodeId, ProcessorChain};
use tonegraph_core::{
    OptionsHandle, ParamSet, ParamSmoother, Params, PortDescriptor, PortDirection, PortLayout,
    Processor, ProcessorCategory,
};

const OUT: &[PortDescriptor] = &[PortDescriptor::audio_out("out")];
const IN_1: &[PortDescriptor] = &[PortDescriptor::audio_in("in")];
const IN_2: &[PortDescriptor] = &[
    PortDescriptor::audio_in("in"),
    PortDescriptor::control_in("mod a"),
];
const IN_3: &[PortDescriptor] = &[
    PortDescriptor::audio_in("in"),
    PortDescriptor::control_in("mod a"),
    PortDescriptor::control_in("mod b"),
];

/// Pass-through processor with 1 to 3 input ports.
struct Stub {
    inputs: &'static [PortDescriptor],
    params: Params,
    options: OptionsHandle,
}

impl Stub {
    fn boxed(input_count: usize) -> Box<dyn Processor> {
        let inputs = match input_count {
            0 | 1 => IN_1,
            2 => IN_2,
            _ => IN_3,
        };
        Box::new(Self {
            inputs,
            params: ParamSet::shared(&[]),
            options: OptionsHandle::default(),
        })
    }
}

impl Processor for Stub {
    fn processor_type(&self) -> &'static str {
        "stub"
    }
    fn name(&self) -> &'static str {
        "Stub"
    }
    fn category(&self) -> ProcessorCategory {
        ProcessorCategory::Other
    }
    fn port_layout(&self) -> PortLayout {
        PortLayout {
            inputs: self.inputs,
            outputs: OUT,
        }
    }
    fn params(&self) -> &Params {
        &self.params
    }
    fn options(&self) -> &OptionsHandle {
        &self.options
    }
    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}
    fn process_audio(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
}

/// A chain of `count` stubs with three inputs each, plus its node ids
/// (Input, Output, then the stubs).
fn build(count: usize) -> (ProcessorChain, Vec<NodeId>) {
    let (mut chain, renderer) = ProcessorChain::new(ChainConfig {
        max_nodes: count,
        ..ChainConfig::default()
    });
    // rendering is not under test; the queue never fills in these runs
    drop(renderer);
    let mut ids = vec![chain.input_id(), chain.output_id()];
    for _ in 0..count {
        ids.push(chain.add_node(Stub::boxed(3)).unwrap());
    }
    (chain, ids)
}

fn descriptor(ids: &[NodeId], (s, sp, d, dp): (usize, usize, usize, usize)) -> ConnectionDescriptor {
    ConnectionDescriptor::new(ids[s % ids.len()], sp, ids[d % ids.len()], dp)
}

fn edges() -> impl Strategy<Value = Vec<(usize, usize, usize, usize)>> {
    prop::collection::vec((0usize..8, 0usize..2, 0usize..8, 0usize..3), 0..40)
}

fn connection_set(chain: &ProcessorChain) -> BTreeSet<ConnectionDescriptor> {
    chain.connections().copied().collect()
}

fn assert_topological(chain: &ProcessorChain) -> Result<(), TestCaseError> {
    let order = chain.processing_order();
    let position = |id: NodeId| order.iter().position(|&n| n == id);
    prop_assert_eq!(order.first().copied(), Some(chain.input_id()));
    prop_assert_eq!(order.last().copied(), Some(chain.output_id()));
    prop_assert_eq!(order.len(), chain.node_ids().count());
    for c in chain.connections() {
        prop_assert!(
            position(c.source) < position(c.dest),
            "{} is not ordered in {:?}",
            c,
            order
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After any sequence of connects and disconnects, the processing order
    /// is a topological order with Input first and Output last.
    #[test]
    fn order_stays_topological(ops in edges(), removals in prop::collection::vec(any::<bool>(), 40)) {
        let (mut chain, ids) = build(6);
        for (i, edge) in ops.into_iter().enumerate() {
            let c = descriptor(&ids, edge);
            if removals[i] && chain.contains_connection(&c) {
                chain.disconnect(c).unwrap();
            } else {
                let _ = chain.connect(c);
            }
            assert_topological(&chain)?;
        }
    }

    /// `connect` immediately followed by `disconnect` restores the
    /// connection set exactly.
    #[test]
    fn connect_disconnect_round_trip(setup in edges(), probe in (0usize..8, 0usize..2, 0usize..8, 0usize..3)) {
        let (mut chain, ids) = build(6);
        for edge in setup {
            let _ = chain.connect(descriptor(&ids, edge));
        }
        let before = connection_set(&chain);
        let c = descriptor(&ids, probe);
        if chain.connect(c).is_ok() {
            chain.disconnect(c).unwrap();
        }
        prop_assert_eq!(connection_set(&chain), before);
        assert_topological(&chain)?;
    }

    /// Removing a node removes exactly the connections that touch it.
    #[test]
    fn remove_is_a_set_difference(setup in edges(), victim in 2usize..8) {
        let (mut chain, ids) = build(6);
        for edge in setup {
            let _ = chain.connect(descriptor(&ids, edge));
        }
        let victim = ids[victim];
        let before = connection_set(&chain);
        let removed: BTreeSet<_> = chain.remove_node(victim).unwrap().into_iter().collect();

        let expected: BTreeSet<_> = before.iter().filter(|c| !c.touches(victim)).copied().collect();
        prop_assert_eq!(connection_set(&chain), expected);
        let touching: BTreeSet<_> = before.iter().filter(|c| c.touches(victim)).copied().collect();
        prop_assert_eq!(removed, touching);
        assert_topological(&chain)?;
    }

    /// Replacing a node with one that has fewer inputs drops exactly the
    /// connections into missing ports, reports each, and keeps the rest.
    #[test]
    fn replace_drops_only_out_of_range(setup in edges(), target in 2usize..8, inputs in 1usize..3) {
        let (mut chain, ids) = build(6);
        for edge in setup {
            let _ = chain.connect(descriptor(&ids, edge));
        }
        let target = ids[target];
        let before = connection_set(&chain);
        let dropped = chain.replace_node(target, Stub::boxed(inputs)).unwrap();

        let expected_drops: BTreeSet<_> = before
            .iter()
            .filter(|c| c.dest == target && c.dest_port >= inputs)
            .copied()
            .collect();
        let reported: BTreeSet<_> = dropped.iter().map(|d| d.connection).collect();
        prop_assert_eq!(&reported, &expected_drops);
        prop_assert!(dropped.iter().all(|d| d.missing == PortDirection::Input));
        let survivors: BTreeSet<_> = before.difference(&expected_drops).copied().collect();
        prop_assert_eq!(connection_set(&chain), survivors);
        prop_assert_eq!(chain.node(target).unwrap().inputs().len(), inputs);
    }

    /// A step from A to B reaches B within ceil(L*R) samples and never moves
    /// away from B on the way.
    #[test]
    fn smoother_step_is_bounded_and_monotone(
        a in -10.0f32..10.0,
        b in -10.0f32..10.0,
        ramp in 0.0005f32..0.05,
        rate in prop::sample::select(vec![22050.0f32, 44100.0, 48000.0, 96000.0]),
    ) {
        let mut smoother = ParamSmoother::new(ramp);
        let limit = (f64::from(ramp) * f64::from(rate)).ceil().max(1.0) as usize;
        smoother.prepare(rate, limit + 16);
        smoother.reset(a);
        smoother.process(b, limit + 16);

        if a == b {
            prop_assert!(!smoother.is_smoothing());
        } else {
            let trajectory = smoother.smoothed_buffer();
            prop_assert_eq!(trajectory[limit - 1], b);
            let mut previous = a;
            for &v in trajectory {
                if b > a {
                    prop_assert!(v >= previous && v <= b);
                } else {
                    prop_assert!(v <= previous && v >= b);
                }
                previous = v;
            }
        }
        smoother.process(b, 8);
        prop_assert!(!smoother.is_smoothing());
        prop_assert_eq!(smoother.current_value(), b);
    }

    /// Mapped trajectories stay monotone for a monotone taper.
    #[test]
    fn smoother_taper_preserves_monotonicity(a in 0.0f32..1.0, b in 0.0f32..1.0) {
        let mut smoother = ParamSmoother::new(0.001).with_mapping(|x| 0.1 + 0.89 * x.sqrt());
        smoother.prepare(48000.0, 64);
        smoother.reset(a);
        smoother.process(b, 64);
        let t = smoother.smoothed_buffer();
        for pair in t.windows(2) {
            if b >= a {
                prop_assert!(pair[1] >= pair[0]);
            } else {
                prop_assert!(pair[1] <= pair[0]);
            }
        }
    }
}
