//! Seam between the chain and whatever catalogue builds processors.

use crate::processor::Processor;

/// Builds processors by type identifier.
///
/// The chain never constructs DSP itself. Loading saved state goes through a
/// factory so the chain stays independent of the concrete models.
pub trait ProcessorFactory {
    /// A freshly constructed processor, or `None` for an unknown type.
    fn create(&self, type_id: &str) -> Option<Box<dyn Processor>>;

    /// Every type identifier this factory can build.
    fn type_ids(&self) -> Vec<&'static str>;

    /// Whether `type_id` is known.
    fn contains(&self, type_id: &str) -> bool {
        self.type_ids().contains(&type_id)
    }
}
