//! Model tuning files.
//!
//! Tuning is TOML. Every table and key is optional:
//!
//! ```toml
//! [diode_clipper.oversampling]
//! below_sample_rate = 96000.0
//! ratio = "x4"
//!
//! [cry_baby]
//! max_iterations = 12
//! tolerance = 1e-10
//! preroll_max_blocks = 4000
//! ```

use std::path::Path;

use tonegraph_models::ModelTuning;

use crate::{ConfigError, fs};

/// Parses tuning from TOML text.
pub fn tuning_from_toml(toml_str: &str) -> Result<ModelTuning, ConfigError> {
    Ok(toml::from_str(toml_str)?)
}

/// Serializes tuning as pretty TOML.
pub fn tuning_to_toml(tuning: &ModelTuning) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(tuning)?)
}

/// Reads a tuning file.
pub fn load_tuning(path: impl AsRef<Path>) -> Result<ModelTuning, ConfigError> {
    tuning_from_toml(&fs::read(path.as_ref())?)
}

/// Writes a tuning file, creating parent directories as needed.
pub fn save_tuning(tuning: &ModelTuning, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    fs::write(path.as_ref(), &tuning_to_toml(tuning)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegraph_core::OversamplingRatio;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(tuning_from_toml("").unwrap(), ModelTuning::default());
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let tuning = tuning_from_toml(
            r#"
            [cry_baby]
            max_iterations = 12

            [diode_clipper.oversampling]
            below_sample_rate = 96000.0
            ratio = "x4"
            "#,
        )
        .unwrap();
        assert_eq!(tuning.cry_baby.max_iterations, 12);
        assert_eq!(tuning.cry_baby.preroll_max_blocks, 2000);
        assert_eq!(tuning.cry_baby.oversampling.ratio, OversamplingRatio::X2);
        assert!(tuning.diode_clipper.oversampling.engages(48000.0));
        assert_eq!(tuning.diode_clipper.oversampling.ratio, OversamplingRatio::X4);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            tuning_from_toml("[cry_baby]\nmax_iterations = \"many\""),
            Err(ConfigError::TomlParse(_))
        ));
        assert!(matches!(
            tuning_from_toml("[diode_clipper.oversampling]\nbelow_sample_rate = 1.0\nratio = \"x3\""),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn text_round_trip() {
        let mut tuning = ModelTuning::default();
        tuning.cry_baby.tolerance = 1e-7;
        tuning.cry_baby.preroll_max_blocks = 10;
        let text = tuning_to_toml(&tuning).unwrap();
        assert!(text.contains("[cry_baby]"));
        assert_eq!(tuning_from_toml(&text).unwrap(), tuning);
    }
}
