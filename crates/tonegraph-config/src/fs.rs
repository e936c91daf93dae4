//! File helpers shared by the state and tuning loaders.

use std::path::Path;

use crate::ConfigError;

pub(crate) fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))
}

/// Writes `content`, creating missing parent directories first.
pub(crate) fn write(path: &Path, content: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}
