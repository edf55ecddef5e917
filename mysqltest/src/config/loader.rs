//! Configuration file loading.

use std::fs;
use std::path::Path;

use crate::config::schema::InstanceConfig;
use crate::error::{Error, Result};

/// Loads [`InstanceConfig`] values from YAML.
///
/// # Examples
///
/// ```
/// use mysqltest::config::ConfigLoader;
///
/// let config = ConfigLoader::load_str("skip_networking: false\nport: 13306\n").unwrap();
/// assert_eq!(config.port, Some(13306));
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and parse a YAML configuration file.
    ///
    /// Relative paths inside the file are kept as written; they are made
    /// absolute against the current directory during resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Path`] if the file cannot be read and
    /// [`Error::Configuration`] if the YAML is invalid.
    pub fn load_file(path: &Path) -> Result<InstanceConfig> {
        let contents = fs::read_to_string(path).map_err(|e| Error::Path {
            path: path.to_path_buf(),
            reason: format!("failed to read configuration file: {e}"),
        })?;

        let config = Self::load_str(&contents)?;
        log::debug!("loaded instance configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a YAML document.
    ///
    /// An empty document yields [`InstanceConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the YAML is invalid or names an
    /// unknown field.
    pub fn load_str(contents: &str) -> Result<InstanceConfig> {
        if contents.trim().is_empty() {
            return Ok(InstanceConfig::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}
