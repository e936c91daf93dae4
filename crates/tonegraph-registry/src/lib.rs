//! Processor registry and factory for tonegraph circuit models.
//!
//! This crate is the catalogue a chain builds its nodes from. It maps stable
//! type identifiers (`"diode_clipper"`, `"cry_baby"`) to constructors and
//! implements [`ProcessorFactory`], so
//! [`ProcessorChain::load_state`](tonegraph_core::ProcessorChain::load_state)
//! can rebuild saved chains without knowing any model.
//!
//! Constructors take the registry's [`ModelTuning`], so every processor it
//! builds shares one set of oversampling thresholds and solver limits.
//!
//! # Example
//!
//! ```rust
//! use tonegraph_core::{ChainConfig, ConnectionDescriptor, ProcessorChain, ProcessorCategory};
//! use tonegraph_registry::ProcessorRegistry;
//!
//! let registry = ProcessorRegistry::new();
//!
//! for d in registry.all() {
//!     println!("{}: {}", d.id, d.description);
//! }
//!
//! let (mut chain, _renderer) = ProcessorChain::new(ChainConfig::default());
//! let clipper = chain.add_node(registry.create("diode_clipper").unwrap()).unwrap();
//! chain.connect(ConnectionDescriptor::main(chain.input_id(), clipper)).unwrap();
//! chain.connect(ConnectionDescriptor::main(clipper, chain.output_id())).unwrap();
//!
//! assert_eq!(registry.in_category(ProcessorCategory::Drive).len(), 1);
//! ```

use tonegraph_core::{ParamDescriptor, Processor, ProcessorCategory, ProcessorFactory};
use tonegraph_models::{CryBaby, DiodeClipper, ModelTuning};

/// Describes a processor in the registry.
#[derive(Debug, Clone)]
pub struct ProcessorDescriptor {
    /// Unique identifier (lowercase, no spaces). Stored in saved chains.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for grouping.
    pub category: ProcessorCategory,
}

/// Constructor stored per registry entry.
pub type Constructor = fn(&ModelTuning) -> Box<dyn Processor>;

struct RegistryEntry {
    descriptor: ProcessorDescriptor,
    constructor: Constructor,
}

/// Registry of every available processor.
pub struct ProcessorRegistry {
    entries: Vec<RegistryEntry>,
    tuning: ModelTuning,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("ids", &self.type_ids())
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl ProcessorRegistry {
    /// Registry with every built-in model and default tuning.
    pub fn new() -> Self {
        Self::with_tuning(ModelTuning::default())
    }

    /// Registry with every built-in model and the given tuning.
    pub fn with_tuning(tuning: ModelTuning) -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(2),
            tuning,
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register(
            ProcessorDescriptor {
                id: DiodeClipper::TYPE_ID,
                name: "Diode Clipper",
                description: "WDF diode clipper with selectable diode type and count",
                category: ProcessorCategory::Drive,
            },
            |tuning| Box::new(DiodeClipper::with_tuning(tuning.diode_clipper)),
        );

        self.register(
            ProcessorDescriptor {
                id: CryBaby::TYPE_ID,
                name: "Cry Baby",
                description: "Nodal-DK wah pedal with a modulatable sweep input",
                category: ProcessorCategory::Other,
            },
            |tuning| Box::new(CryBaby::with_tuning(tuning.cry_baby)),
        );
    }

    /// Adds a processor type. A later registration under an existing id
    /// replaces the earlier one.
    pub fn register(&mut self, descriptor: ProcessorDescriptor, constructor: Constructor) {
        let entry = RegistryEntry {
            descriptor,
            constructor,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.id == entry.descriptor.id)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Tuning handed to every constructor.
    pub fn tuning(&self) -> &ModelTuning {
        &self.tuning
    }

    /// Replaces the tuning used for processors created from now on.
    pub fn set_tuning(&mut self, tuning: ModelTuning) {
        self.tuning = tuning;
    }

    /// Every registered processor, in registration order.
    pub fn all(&self) -> Vec<&ProcessorDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Processors in one category.
    pub fn in_category(&self, category: ProcessorCategory) -> Vec<&ProcessorDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Descriptor for `id`.
    pub fn get(&self, id: &str) -> Option<&ProcessorDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Builds a processor. Returns `None` for an unknown id.
    pub fn create(&self, id: &str) -> Option<Box<dyn Processor>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.constructor)(&self.tuning))
    }

    /// Parameter descriptors of `id`, `on_off` first.
    pub fn param_descriptors(&self, id: &str) -> Option<Vec<ParamDescriptor>> {
        self.create(id)
            .map(|p| p.params().descriptors().to_vec())
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProcessorFactory for ProcessorRegistry {
    fn create(&self, type_id: &str) -> Option<Box<dyn Processor>> {
        ProcessorRegistry::create(self, type_id)
    }

    fn type_ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.descriptor.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegraph_core::{OptionsHandle, ParamSet, Params};
    use tonegraph_models::WahTuning;

    #[test]
    fn builtin_models_are_registered() {
        let registry = ProcessorRegistry::new();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert!(registry.get("diode_clipper").is_some());
        assert!(registry.get("cry_baby").is_some());
        assert!(registry.get("fuzz").is_none());
    }

    #[test]
    fn created_processors_match_their_descriptors() {
        let registry = ProcessorRegistry::new();
        for d in registry.all() {
            let p = registry.create(d.id).unwrap();
            assert_eq!(p.processor_type(), d.id);
            assert_eq!(p.name(), d.name);
            assert_eq!(p.category(), d.category);
        }
    }

    #[test]
    fn categories() {
        let registry = ProcessorRegistry::new();
        let drive = registry.in_category(ProcessorCategory::Drive);
        assert_eq!(drive.len(), 1);
        assert_eq!(drive[0].id, "diode_clipper");
        assert!(registry.in_category(ProcessorCategory::Boundary).is_empty());
    }

    #[test]
    fn param_descriptors_include_on_off() {
        let registry = ProcessorRegistry::new();
        let params = registry.param_descriptors("cry_baby").unwrap();
        let ids: Vec<_> = params.iter().map(|d| d.id).collect();
        assert_eq!(ids, ["on_off", "control_freq"]);
        assert!(registry.param_descriptors("nope").is_none());
    }

    #[test]
    fn factory_trait_lists_types() {
        let registry = ProcessorRegistry::new();
        let factory: &dyn ProcessorFactory = &registry;
        assert_eq!(factory.type_ids(), ["diode_clipper", "cry_baby"]);
        assert!(factory.contains("cry_baby"));
        assert!(!factory.contains("input"));
        assert!(factory.create("unknown").is_none());
    }

    #[test]
    fn tuning_reaches_constructors() {
        let mut tuning = ModelTuning::default();
        tuning.cry_baby = WahTuning {
            max_iterations: 1,
            ..WahTuning::default()
        };
        let registry = ProcessorRegistry::with_tuning(tuning);
        assert_eq!(registry.tuning().cry_baby.max_iterations, 1);

        let mut wah = registry.create("cry_baby").unwrap();
        wah.prepare(48000.0, 128);
        for _ in 0..4 {
            let mut left: Vec<f32> = (0..128).map(|n| (n as f32 * 0.05).sin() * 0.2).collect();
            let mut right = left.clone();
            wah.process_audio(&mut left, &mut right);
        }
        assert!(wah.solver_fallbacks() > 0);
    }

    struct Trim {
        params: Params,
        options: OptionsHandle,
    }

    impl Processor for Trim {
        fn processor_type(&self) -> &'static str {
            "trim"
        }
        fn name(&self) -> &'static str {
            "Trim"
        }
        fn category(&self) -> ProcessorCategory {
            ProcessorCategory::Tone
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

    #[test]
    fn custom_registration() {
        let mut registry = ProcessorRegistry::new();
        let descriptor = ProcessorDescriptor {
            id: "trim",
            name: "Trim",
            description: "Does nothing",
            category: ProcessorCategory::Tone,
        };
        let make: Constructor = |_| {
            Box::new(Trim {
                params: ParamSet::shared(&[]),
                options: OptionsHandle::default(),
            })
        };
        registry.register(descriptor.clone(), make);
        registry.register(descriptor, make);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.create("trim").unwrap().name(), "Trim");
    }
}
