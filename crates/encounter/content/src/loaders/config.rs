//! Encounter configuration loader.

use std::path::Path;

use encounter_core::EncounterConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for encounter configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file containing EncounterConfig
    ///
    /// # Returns
    ///
    /// Returns an EncounterConfig. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<EncounterConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<EncounterConfig> {
        let config: EncounterConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }

    /// The bundled default configuration.
    pub fn bundled() -> LoadResult<EncounterConfig> {
        Self::parse(include_str!("../../data/config.toml"))
    }
}
