//! Platform-specific locations for tonegraph files.
//!
//! - **User config**: `~/.config/tonegraph/` (Linux),
//!   `~/Library/Application Support/tonegraph/` (macOS), `%APPDATA%\tonegraph\` (Windows)
//! - **Default tuning**: `<user config>/tuning.toml`
//! - **Saved chains**: `<user config>/chains/`

use std::path::PathBuf;

use tonegraph_models::ModelTuning;

use crate::{ConfigError, load_tuning};

const APP_NAME: &str = "tonegraph";
const CHAINS_SUBDIR: &str = "chains";
const TUNING_FILE: &str = "tuning.toml";
const CHAIN_EXTENSION: &str = "json";

/// User configuration directory. Falls back to the working directory when the
/// platform has none.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding saved chain states.
pub fn user_chains_dir() -> PathBuf {
    user_config_dir().join(CHAINS_SUBDIR)
}

/// Path of the default tuning file, whether or not it exists.
pub fn default_tuning_path() -> PathBuf {
    user_config_dir().join(TUNING_FILE)
}

/// Loads the default tuning file, or the built-in tuning when there is none.
///
/// A file that exists but does not parse is an error.
pub fn load_default_tuning() -> Result<ModelTuning, ConfigError> {
    let path = default_tuning_path();
    if path.is_file() {
        load_tuning(path)
    } else {
        Ok(ModelTuning::default())
    }
}

/// Resolves a chain state by path or by name.
///
/// `name` is tried as a path first, then as a file in [`user_chains_dir`]
/// with or without the `.json` extension.
pub fn find_chain(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if path.extension().is_some_and(|e| e == CHAIN_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}.{CHAIN_EXTENSION}")
    };
    let user_path = user_chains_dir().join(filename);
    user_path.is_file().then_some(user_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_config_dir() {
        let root = user_config_dir();
        assert!(root.ends_with(APP_NAME));
        assert_eq!(user_chains_dir(), root.join("chains"));
        assert_eq!(default_tuning_path(), root.join("tuning.toml"));
    }

    #[test]
    fn existing_path_is_found_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mine.json");
        std::fs::write(&file, "{}").unwrap();
        assert_eq!(find_chain(file.to_str().unwrap()), Some(file));
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(find_chain("no-such-chain-7f3a2c").is_none());
    }
}
