//! config
//!
//! TOML configuration for the CLI.
//!
//! # Example
//!
//! ```toml
//! checkpoints_dir = "/models/checkpoints"
//! loras_dir = "/models/loras"
//! created_by = "render-farm-03"
//! reserved_lora = "builtin_lcm.safetensors"
//! ```
//!
//! Every field is optional; missing directories simply yield empty model
//! catalogs. The library itself takes these values through
//! [`crate::codec::MetadataContext`] and never reads config files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding base and refiner model files.
    pub checkpoints_dir: Option<PathBuf>,

    /// Directory holding LoRA files.
    pub loras_dir: Option<PathBuf>,

    /// Attribution written into serialized metadata.
    pub created_by: Option<String>,

    /// LoRA filename excluded from stem matching.
    pub reserved_lora: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// The configured attribution, or empty when unset.
    pub fn created_by(&self) -> &str {
        self.created_by.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "checkpoints_dir = \"/models/checkpoints\"\n\
             loras_dir = \"/models/loras\"\n\
             created_by = \"render-farm-03\"\n\
             reserved_lora = \"builtin_lcm.safetensors\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.checkpoints_dir.as_deref(),
            Some(Path::new("/models/checkpoints"))
        );
        assert_eq!(config.created_by(), "render-farm-03");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.created_by(), "");
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mystery_knob = true").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/geninfo.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
