//! Boss definition loader.

use std::path::Path;

use encounter_core::BossDefinition;

use crate::loaders::{LoadResult, read_file};

/// Loader for boss definitions from RON files.
pub struct BossLoader;

impl BossLoader {
    /// Load a boss definition from a RON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing a BossDefinition
    ///
    /// # Returns
    ///
    /// Returns a validated BossDefinition.
    pub fn load(path: &Path) -> LoadResult<BossDefinition> {
        let content = read_file(path)?;
        let definition = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))?;

        tracing::debug!(
            boss = %definition.name,
            path = %path.display(),
            "boss definition loaded"
        );
        Ok(definition)
    }

    /// Parse and validate a boss definition from RON text.
    pub fn parse(content: &str) -> LoadResult<BossDefinition> {
        let definition: BossDefinition = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse boss definition RON: {}", e))?;

        definition.validate().map_err(|e| {
            anyhow::anyhow!("Invalid boss definition '{}': {}", definition.name, e)
        })?;

        Ok(definition)
    }
}
