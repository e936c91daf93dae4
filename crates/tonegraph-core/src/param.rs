//! Lock-free parameter storage shared between control and audio threads.
//!
//! A processor's parameters live in a [`ParamSet`] behind an `Arc` ([`Params`]).
//! The control thread keeps one clone and writes through
//! [`ParamSet::set`]; the audio thread keeps another inside the processor and
//! reads with [`ParamSet::value`]. Values are f32 bit patterns in `AtomicU32`,
//! so neither side ever blocks.
//!
//! Every set starts with the base `on_off` toggle at index [`ON_OFF`]; a
//! processor's own parameters follow from index 1 in declaration order.
//!
//! # Normalization
//!
//! [`ParamScale::Skewed`] reproduces a potentiometer-style skew: the `centre`
//! value lands at normalized 0.5. The exponent is
//! `ln(0.5) / ln((centre - min) / (max - min))`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Flat `id → value` snapshot of a parameter set, used for persistence.
pub type ParamSnapshot = BTreeMap<String, f32>;

/// Shared handle to a processor's parameters.
pub type Params = Arc<ParamSet>;

/// Index of the base `on_off` toggle in every [`ParamSet`].
pub const ON_OFF: usize = 0;

/// Identifier of the base bypass toggle.
pub const ON_OFF_ID: &str = "on_off";

/// Normalization curve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParamScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// Skewed so that `centre` maps to normalized 0.5.
    Skewed {
        /// Plain value at the middle of the normalized range.
        centre: f32,
    },
}

/// What the parameter's value means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous value.
    Float,
    /// Index into a fixed list of labels.
    Choice(&'static [&'static str]),
    /// 0 = off, 1 = on.
    Toggle,
}

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Stable identifier used for persistence and lookup.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Unit suffix, empty when unitless.
    pub unit: &'static str,
    /// Minimum plain value.
    pub min: f32,
    /// Maximum plain value.
    pub max: f32,
    /// Default plain value.
    pub default: f32,
    /// Normalization curve.
    pub scale: ParamScale,
    /// Value semantics.
    pub kind: ParamKind,
}

impl ParamDescriptor {
    /// Continuous parameter with a linear range.
    pub const fn float(id: &'static str, name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            id,
            name,
            unit: "",
            min,
            max,
            default,
            scale: ParamScale::Linear,
            kind: ParamKind::Float,
        }
    }

    /// 0–1 parameter displayed as a percentage.
    pub const fn percent(id: &'static str, name: &'static str, default: f32) -> Self {
        Self::float(id, name, 0.0, 1.0, default).with_unit("%")
    }

    /// Frequency in Hz, skewed around `centre`.
    pub const fn frequency(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        centre: f32,
    ) -> Self {
        Self::float(id, name, min, max, default)
            .with_unit("Hz")
            .with_centre(centre)
    }

    /// Discrete choice between labels; the value is the label index.
    pub const fn choice(
        id: &'static str,
        name: &'static str,
        labels: &'static [&'static str],
        default: usize,
    ) -> Self {
        let max = if labels.is_empty() { 0.0 } else { (labels.len() - 1) as f32 };
        Self {
            id,
            name,
            unit: "",
            min: 0.0,
            max,
            default: default as f32,
            scale: ParamScale::Linear,
            kind: ParamKind::Choice(labels),
        }
    }

    /// Boolean toggle.
    pub const fn toggle(id: &'static str, name: &'static str, default: bool) -> Self {
        Self {
            id,
            name,
            unit: "",
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            scale: ParamScale::Linear,
            kind: ParamKind::Toggle,
        }
    }

    /// Sets the unit suffix.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Skews the range so that `centre` sits at normalized 0.5.
    pub const fn with_centre(mut self, centre: f32) -> Self {
        self.scale = ParamScale::Skewed { centre };
        self
    }

    /// Clamps a plain value to the range, rounding discrete kinds.
    pub fn clamp(&self, value: f32) -> f32 {
        let v = if value.is_finite() { value } else { self.default };
        let v = v.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Float => v,
            ParamKind::Choice(_) | ParamKind::Toggle => v.round(),
        }
    }

    fn skew(&self) -> f32 {
        match self.scale {
            ParamScale::Linear => 1.0,
            ParamScale::Skewed { centre } => {
                let proportion = (centre - self.min) / (self.max - self.min);
                if proportion > 0.0 && proportion < 1.0 {
                    libm::logf(0.5) / libm::logf(proportion)
                } else {
                    1.0
                }
            }
        }
    }

    /// Plain value to \[0, 1\].
    pub fn to_normalized(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let proportion = ((self.clamp(value) - self.min) / span).clamp(0.0, 1.0);
        libm::powf(proportion, self.skew())
    }

    /// \[0, 1\] to plain value.
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let proportion = libm::powf(normalized.clamp(0.0, 1.0), 1.0 / self.skew());
        self.clamp(self.min + proportion * (self.max - self.min))
    }

    /// Formats a plain value for display.
    pub fn format_value(&self, value: f32) -> String {
        match self.kind {
            ParamKind::Choice(labels) => labels
                .get(self.clamp(value) as usize)
                .map_or_else(String::new, |l| (*l).to_string()),
            ParamKind::Toggle => (if value >= 0.5 { "on" } else { "off" }).to_string(),
            ParamKind::Float if self.unit == "%" => format!("{:.0}%", value * 100.0),
            ParamKind::Float if self.unit.is_empty() => format!("{value:.2}"),
            ParamKind::Float => format!("{value:.1} {}", self.unit),
        }
    }
}

/// A thread-safe atomic f32 using bit casting.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicU32,
}

impl AtomicParam {
    /// Creates a parameter holding `value`.
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicU32::new(value.to_bits()),
        }
    }

    /// Stores a value (control thread).
    #[inline]
    pub fn set(&self, v: f32) {
        self.value.store(v.to_bits(), Ordering::Release);
    }

    /// Loads the value (audio thread).
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }
}

/// The parameters of one processor.
#[derive(Debug)]
pub struct ParamSet {
    descriptors: Vec<ParamDescriptor>,
    values: Vec<AtomicParam>,
    enabled: Vec<AtomicBool>,
}

impl ParamSet {
    /// Builds a set holding the base `on_off` toggle followed by `descriptors`.
    ///
    /// Every value starts at its default.
    pub fn new(descriptors: &[ParamDescriptor]) -> Self {
        let mut all = Vec::with_capacity(descriptors.len() + 1);
        all.push(ParamDescriptor::toggle(ON_OFF_ID, "On/Off", true));
        all.extend_from_slice(descriptors);
        let values = all.iter().map(|d| AtomicParam::new(d.default)).collect();
        let enabled = all.iter().map(|_| AtomicBool::new(true)).collect();
        Self {
            descriptors: all,
            values,
            enabled,
        }
    }

    /// Convenience constructor returning the shared handle.
    pub fn shared(descriptors: &[ParamDescriptor]) -> Params {
        Arc::new(Self::new(descriptors))
    }

    /// Number of parameters, including `on_off`.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always false: the base toggle is present.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All descriptors in index order.
    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    /// Descriptor at `index`.
    pub fn descriptor(&self, index: usize) -> Option<&ParamDescriptor> {
        self.descriptors.get(index)
    }

    /// Index of the parameter with the given id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.id == id)
    }

    /// Value at `index`. Returns 0.0 when out of range.
    ///
    /// Wait-free; safe on the audio thread.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.values.get(index).map_or(0.0, AtomicParam::get)
    }

    /// Value of the parameter with the given id.
    pub fn get(&self, id: &str) -> Option<f32> {
        self.index_of(id).map(|i| self.value(i))
    }

    /// Clamps and stores a value by index. Returns false when out of range.
    pub fn set_index(&self, index: usize, value: f32) -> bool {
        match (self.descriptors.get(index), self.values.get(index)) {
            (Some(desc), Some(slot)) => {
                slot.set(desc.clamp(value));
                true
            }
            _ => false,
        }
    }

    /// Clamps and stores a value by id. Returns false for an unknown id.
    pub fn set(&self, id: &str, value: f32) -> bool {
        self.index_of(id).is_some_and(|i| self.set_index(i, value))
    }

    /// Whether the processor is switched on.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.value(ON_OFF) >= 0.5
    }

    /// Whether the parameter is user-editable (false while host-driven).
    pub fn is_enabled(&self, id: &str) -> bool {
        self.index_of(id)
            .is_some_and(|i| self.enabled[i].load(Ordering::Acquire))
    }

    /// Marks a parameter editable or host-driven. Returns true if the flag changed.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        match self.index_of(id) {
            Some(i) => self.enabled[i].swap(enabled, Ordering::AcqRel) != enabled,
            None => false,
        }
    }

    /// Ids of parameters that are currently disabled.
    pub fn disabled_ids(&self) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .zip(&self.enabled)
            .filter(|(_, e)| !e.load(Ordering::Acquire))
            .map(|(d, _)| d.id)
            .collect()
    }

    /// Copies every current value into a snapshot.
    pub fn snapshot(&self) -> ParamSnapshot {
        self.descriptors
            .iter()
            .zip(&self.values)
            .map(|(d, v)| (d.id.to_string(), v.get()))
            .collect()
    }

    /// Applies a snapshot. Unknown ids are ignored; values are clamped.
    ///
    /// Returns the number of values applied.
    pub fn restore(&self, snapshot: &ParamSnapshot) -> usize {
        snapshot
            .iter()
            .filter(|(id, value)| self.set(id, **value))
            .count()
    }

    /// Returns every parameter to its default.
    pub fn reset_to_defaults(&self) {
        for (desc, slot) in self.descriptors.iter().zip(&self.values) {
            slot.set(desc.default);
        }
    }
}
