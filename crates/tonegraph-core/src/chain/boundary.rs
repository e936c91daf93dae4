//! The chain's permanent Input and Output nodes.
//!
//! They carry no DSP. The renderer copies host audio into the Input node's
//! buffer and reads the Output node's buffer back out, so their slots on the
//! audio side stay empty.

use crate::options::{OptionsHandle, ProcessorOptions};
use crate::param::{ParamSet, Params};
use crate::port::PortLayout;
use crate::processor::{Processor, ProcessorCategory};

/// Registry-style type id of the Input node.
pub const INPUT_TYPE: &str = "input";
/// Registry-style type id of the Output node.
pub const OUTPUT_TYPE: &str = "output";

pub(crate) struct BoundaryNode {
    processor_type: &'static str,
    name: &'static str,
    layout: PortLayout,
    params: Params,
    options: OptionsHandle,
}

impl BoundaryNode {
    pub(crate) fn input() -> Self {
        Self::new(INPUT_TYPE, "Input", PortLayout::source(), "Audio entering the chain.")
    }

    pub(crate) fn output() -> Self {
        Self::new(OUTPUT_TYPE, "Output", PortLayout::sink(), "Audio leaving the chain.")
    }

    fn new(
        processor_type: &'static str,
        name: &'static str,
        layout: PortLayout,
        description: &str,
    ) -> Self {
        Self {
            processor_type,
            name,
            layout,
            params: ParamSet::shared(&[]),
            options: OptionsHandle::new(ProcessorOptions::new(description, &[])),
        }
    }
}

impl Processor for BoundaryNode {
    fn processor_type(&self) -> &'static str {
        self.processor_type
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> ProcessorCategory {
        ProcessorCategory::Boundary
    }

    fn port_layout(&self) -> PortLayout {
        self.layout
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_face_outward() {
        let input = BoundaryNode::input();
        assert!(input.port_layout().inputs.is_empty());
        assert_eq!(input.port_layout().outputs.len(), 1);

        let output = BoundaryNode::output();
        assert_eq!(output.port_layout().inputs.len(), 1);
        assert!(output.port_layout().outputs.is_empty());
        assert_eq!(output.category(), ProcessorCategory::Boundary);
    }

    #[test]
    fn only_bypass_parameter() {
        let node = BoundaryNode::output();
        assert_eq!(node.params().len(), 1);
        assert!(node.params().is_on());
    }
}
