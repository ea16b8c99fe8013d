//! Generator configuration loaded from `restfit.toml`.
//!
//! ```toml
//! [generator]
//! enabled = true
//! logging = false
//! src_dir = "src"
//! out_dir = "target/restfit"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::BuildError;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "restfit.toml";

/// Settings of the `[generator]` table. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// When `false`, generation is skipped entirely.
    pub enabled: bool,
    /// Raises log output to debug level.
    pub logging: bool,
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logging: false,
            src_dir: PathBuf::from("src"),
            out_dir: PathBuf::from("target/restfit"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    generator: GeneratorConfig,
}

impl GeneratorConfig {
    /// Reads the configuration at `path`.
    ///
    /// # Errors
    ///
    /// [`BuildError::Read`] if the file cannot be read and
    /// [`BuildError::Config`] if it is not valid.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let text = fs::read_to_string(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Like [`GeneratorConfig::load`], returning the defaults when `path` does
    /// not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, BuildError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration text; `path` is only used in errors.
    pub fn parse(text: &str, path: &Path) -> Result<Self, BuildError> {
        let file: ConfigFile = toml::from_str(text).map_err(|source| BuildError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file.generator)
    }
}
