//! Chain state files.
//!
//! A chain is saved as pretty-printed JSON:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "node_type": "input", "node_id": 0, "params": { "on_off": 1.0 } },
//!     { "node_type": "diode_clipper", "node_id": 2, "params": { "drive": 0.8 } },
//!     { "node_type": "output", "node_id": 1, "params": { "on_off": 1.0 } }
//!   ],
//!   "connections": [
//!     { "source": 0, "source_port": 0, "dest": 2, "dest_port": 0 },
//!     { "source": 2, "source_port": 0, "dest": 1, "dest_port": 0 }
//!   ]
//! }
//! ```
//!
//! Missing `params` fall back to the processor defaults; a missing
//! `connections` list means none.

use std::path::Path;

use tonegraph_core::ChainState;

use crate::{ConfigError, fs};

/// Parses chain state from JSON text.
pub fn chain_state_from_json(json: &str) -> Result<ChainState, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Serializes chain state as pretty JSON.
pub fn chain_state_to_json(state: &ChainState) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Reads a chain state file.
pub fn load_chain_state(path: impl AsRef<Path>) -> Result<ChainState, ConfigError> {
    chain_state_from_json(&fs::read(path.as_ref())?)
}

/// Writes a chain state file, creating parent directories as needed.
pub fn save_chain_state(state: &ChainState, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let mut json = chain_state_to_json(state)?;
    json.push('\n');
    fs::write(path.as_ref(), &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegraph_core::chain::{ConnectionDescriptor, NodeId, NodeState};

    #[test]
    fn parses_minimal_state() {
        let json = r#"{
            "nodes": [
                { "node_type": "input", "node_id": 0 },
                { "node_type": "cry_baby", "node_id": 4, "params": { "control_freq": 0.25 } },
                { "node_type": "output", "node_id": 1 }
            ]
        }"#;
        let state = chain_state_from_json(json).unwrap();
        assert_eq!(state.nodes.len(), 3);
        assert_eq!(state.nodes[1].node_id, NodeId::from_raw(4));
        assert_eq!(state.nodes[1].params.get("control_freq"), Some(&0.25));
        assert!(state.nodes[0].params.is_empty());
        assert!(state.connections.is_empty());
    }

    #[test]
    fn json_text_round_trip() {
        let mut params = tonegraph_core::ParamSnapshot::new();
        params.insert("drive".to_string(), 0.8);
        let state = ChainState {
            nodes: vec![NodeState {
                node_type: "diode_clipper".to_string(),
                node_id: NodeId::from_raw(2),
                params,
            }],
            connections: vec![ConnectionDescriptor::new(
                NodeId::from_raw(0),
                0,
                NodeId::from_raw(2),
                0,
            )],
        };
        let json = chain_state_to_json(&state).unwrap();
        assert!(json.contains("\"node_type\": \"diode_clipper\""));
        assert!(json.contains("\"source\": 0"));
        assert_eq!(chain_state_from_json(&json).unwrap(), state);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            chain_state_from_json("{ \"nodes\": 3 }"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            chain_state_from_json("{}"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_chain_state("/definitely/not/here/chain.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
        assert!(err.to_string().contains("chain.json"));
    }
}
