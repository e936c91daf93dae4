//! Serial chain syntax for `--chain`.
//!
//! ```text
//! diode_clipper:drive=0.8,diode=1N4148 | cry_baby:control_freq=0.3
//! ```
//!
//! ## Grammar
//!
//! ```text
//! chain     ::= processor ( '|' processor )*
//! processor ::= type_id ( ':' key '=' value ( ',' key '=' value )* )?
//! ```
//!
//! Values are plain numbers, `on`/`off` for toggles, or a choice label
//! (case-insensitive). Parsing is pure; [`build_chain`] resolves ids and
//! values against the registry and wires Input → … → Output.

use tonegraph_core::chain::{ChainError, ConnectionDescriptor, NodeId, ProcessorChain};
use tonegraph_core::{ParamDescriptor, ParamKind};
use tonegraph_registry::ProcessorRegistry;

/// One parsed processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSpec {
    /// Registry type id.
    pub type_id: String,
    /// Parameter overrides in order of appearance, values still unparsed.
    pub params: Vec<(String, String)>,
}

/// Parsed chain, first processor first.
pub type ChainSpec = Vec<ProcessorSpec>;

/// Errors from parsing or building a chain.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    /// Nothing to parse.
    #[error("empty chain")]
    Empty,
    /// A `|` with no processor on one side.
    #[error("empty processor at position {index}")]
    EmptySegment {
        /// Zero-based processor position.
        index: usize,
    },
    /// A parameter override without `=`.
    #[error("invalid parameter '{text}' for '{type_id}' (expected key=value)")]
    BadParam {
        /// Processor the override belongs to.
        type_id: String,
        /// The override as written.
        text: String,
    },
    /// Type id not in the registry.
    #[error("unknown processor '{0}' (see `tonegraph processors`)")]
    UnknownProcessor(String),
    /// Parameter id not on the processor.
    #[error("'{type_id}' has no parameter '{param}'")]
    UnknownParam {
        /// Processor type.
        type_id: String,
        /// Offending parameter id.
        param: String,
    },
    /// Value that is neither a number nor a valid label.
    #[error("invalid value '{value}' for '{type_id}.{param}'")]
    BadValue {
        /// Processor type.
        type_id: String,
        /// Parameter id.
        param: String,
        /// The value as written.
        value: String,
    },
    /// The chain refused a node or connection.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Parses a chain string.
pub fn parse_chain(input: &str) -> Result<ChainSpec, DslError> {
    if input.trim().is_empty() {
        return Err(DslError::Empty);
    }
    input
        .split('|')
        .enumerate()
        .map(|(index, segment)| parse_processor(index, segment.trim()))
        .collect()
}

fn parse_processor(index: usize, segment: &str) -> Result<ProcessorSpec, DslError> {
    let (type_id, rest) = match segment.split_once(':') {
        Some((t, r)) => (t.trim(), Some(r)),
        None => (segment, None),
    };
    if type_id.is_empty() {
        return Err(DslError::EmptySegment { index });
    }

    let mut params = Vec::new();
    for text in rest.into_iter().flat_map(|r| r.split(',')) {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let (key, value) = text
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .ok_or_else(|| DslError::BadParam {
                type_id: type_id.to_string(),
                text: text.to_string(),
            })?;
        params.push((key.to_string(), value.to_string()));
    }

    Ok(ProcessorSpec {
        type_id: type_id.to_string(),
        params,
    })
}

/// Parses a parameter value against its descriptor.
pub fn parse_value(descriptor: &ParamDescriptor, value: &str) -> Option<f32> {
    if let Ok(v) = value.parse::<f32>() {
        return v.is_finite().then_some(v);
    }
    match descriptor.kind {
        ParamKind::Toggle => match value.to_ascii_lowercase().as_str() {
            "on" | "true" => Some(1.0),
            "off" | "false" => Some(0.0),
            _ => None,
        },
        ParamKind::Choice(labels) => labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(value))
            .map(|i| i as f32),
        ParamKind::Float => None,
    }
}

/// Adds every processor in `spec` to `chain` and connects them in series
/// between Input and Output. Returns the new node ids in chain order.
pub fn build_chain(
    spec: &ChainSpec,
    chain: &mut ProcessorChain,
    registry: &ProcessorRegistry,
) -> Result<Vec<NodeId>, DslError> {
    let mut ids = Vec::with_capacity(spec.len());
    let mut previous = chain.input_id();

    for processor in spec {
        let node = registry
            .create(&processor.type_id)
            .ok_or_else(|| DslError::UnknownProcessor(processor.type_id.clone()))?;

        let params = node.params();
        for (key, value) in &processor.params {
            let descriptor = params
                .index_of(key)
                .and_then(|i| params.descriptor(i))
                .ok_or_else(|| DslError::UnknownParam {
                    type_id: processor.type_id.clone(),
                    param: key.clone(),
                })?;
            let parsed = parse_value(descriptor, value).ok_or_else(|| DslError::BadValue {
                type_id: processor.type_id.clone(),
                param: key.clone(),
                value: value.clone(),
            })?;
            params.set(key, parsed);
        }

        let id = chain.add_node(node)?;
        chain.connect(ConnectionDescriptor::main(previous, id))?;
        previous = id;
        ids.push(id);
    }

    chain.connect(ConnectionDescriptor::main(previous, chain.output_id()))?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegraph_core::ChainConfig;

    #[test]
    fn parse_single_processor() {
        let spec = parse_chain("cry_baby").unwrap();
        assert_eq!(
            spec,
            vec![ProcessorSpec {
                type_id: "cry_baby".to_string(),
                params: vec![],
            }]
        );
    }

    #[test]
    fn parse_series_with_params() {
        let spec = parse_chain(" diode_clipper:drive=0.8, diode=1N4148 | cry_baby ").unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0].type_id, "diode_clipper");
        assert_eq!(
            spec[0].params,
            vec![
                ("drive".to_string(), "0.8".to_string()),
                ("diode".to_string(), "1N4148".to_string()),
            ]
        );
        assert!(spec[1].params.is_empty());
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse_chain("  "), Err(DslError::Empty)));
        assert!(matches!(
            parse_chain("cry_baby||diode_clipper"),
            Err(DslError::EmptySegment { index: 1 })
        ));
        assert!(matches!(
            parse_chain("diode_clipper:drive"),
            Err(DslError::BadParam { .. })
        ));
        assert!(matches!(
            parse_chain("diode_clipper:=1"),
            Err(DslError::BadParam { .. })
        ));
    }

    #[test]
    fn values_by_kind() {
        let toggle = ParamDescriptor::toggle("on_off", "On", true);
        assert_eq!(parse_value(&toggle, "off"), Some(0.0));
        assert_eq!(parse_value(&toggle, "1"), Some(1.0));
        let choice = ParamDescriptor::choice("diode", "Diodes", &["GZ34", "1N34"], 0);
        assert_eq!(parse_value(&choice, "1n34"), Some(1.0));
        assert_eq!(parse_value(&choice, "1N60"), None);
        let float = ParamDescriptor::float("x", "X", 0.0, 1.0, 0.5);
        assert_eq!(parse_value(&float, "fast"), None);
        assert_eq!(parse_value(&float, "NaN"), None);
    }

    #[test]
    fn build_wires_series_chain() {
        let registry = ProcessorRegistry::new();
        let (mut chain, _renderer) = ProcessorChain::new(ChainConfig::default());
        let spec = parse_chain("diode_clipper:drive=0.8,diode=1N4148|cry_baby:on_off=off").unwrap();
        let ids = build_chain(&spec, &mut chain, &registry).unwrap();

        assert_eq!(ids.len(), 2);
        let (i, o) = (chain.input_id(), chain.output_id());
        assert_eq!(chain.processing_order(), &[i, ids[0], ids[1], o]);
        assert_eq!(chain.connections().count(), 3);
        let clipper = chain.params(ids[0]).unwrap();
        assert!((clipper.get("drive").unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(clipper.get("diode"), Some(2.0));
        assert!(!chain.params(ids[1]).unwrap().is_on());
    }

    #[test]
    fn build_rejects_unknown_names() {
        let registry = ProcessorRegistry::new();
        let (mut chain, _renderer) = ProcessorChain::new(ChainConfig::default());

        let spec = parse_chain("fuzz_face").unwrap();
        assert!(matches!(
            build_chain(&spec, &mut chain, &registry),
            Err(DslError::UnknownProcessor(_))
        ));

        let spec = parse_chain("cry_baby:speed=2").unwrap();
        assert!(matches!(
            build_chain(&spec, &mut chain, &registry),
            Err(DslError::UnknownParam { .. })
        ));

        let spec = parse_chain("cry_baby:control_freq=wide").unwrap();
        assert!(matches!(
            build_chain(&spec, &mut chain, &registry),
            Err(DslError::BadValue { .. })
        ));
    }
}
