//! Registry of bundled and file-loaded boss definitions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use encounter_core::BossDefinition;

use crate::loaders::{BossLoader, LoadResult};

/// Boss definitions keyed by lowercase name.
///
/// Passed explicitly to whoever builds encounters; there is no global catalog.
#[derive(Debug, Clone, Default)]
pub struct BossRegistry {
    bosses: BTreeMap<String, Arc<BossDefinition>>,
}

impl BossRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the boss definitions embedded in this crate.
    pub fn bundled() -> LoadResult<Self> {
        let mut registry = Self::new();

        // The Warden (three-phase melee)
        let warden = BossLoader::parse(include_str!("../../data/bosses/warden.ron"))
            .map_err(|e| anyhow::anyhow!("Failed to load warden.ron: {}", e))?;
        registry.insert(warden);

        // The Hydra (two-phase caster)
        let hydra = BossLoader::parse(include_str!("../../data/bosses/hydra.ron"))
            .map_err(|e| anyhow::anyhow!("Failed to load hydra.ron: {}", e))?;
        registry.insert(hydra);

        Ok(registry)
    }

    /// Adds a definition, replacing any with the same name.
    pub fn insert(&mut self, definition: BossDefinition) {
        self.bosses
            .insert(definition.name.to_ascii_lowercase(), Arc::new(definition));
    }

    /// Case-insensitive lookup by boss name.
    pub fn get(&self, name: &str) -> Option<Arc<BossDefinition>> {
        self.bosses.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Resolves a registered boss name, or failing that a RON file path.
    pub fn resolve(&self, name_or_path: &str) -> LoadResult<Arc<BossDefinition>> {
        if let Some(definition) = self.get(name_or_path) {
            return Ok(definition);
        }

        let path = Path::new(name_or_path);
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Unknown boss '{}' (bundled: {})",
                name_or_path,
                self.names().collect::<Vec<_>>().join(", ")
            ));
        }
        BossLoader::load(path).map(Arc::new)
    }

    /// Registered names as authored.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bosses.values().map(|definition| definition.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bosses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bosses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_core::{BossEncounter, EncounterConfig, ExecutionMode};

    #[test]
    fn bundled_bosses_load_and_validate() {
        let registry = BossRegistry::bundled().expect("Failed to load bundled bosses");
        assert_eq!(registry.len(), 2);

        let warden = registry.get("warden").unwrap();
        assert_eq!(warden.phase_health_thresholds, vec![0.66, 0.33]);
        assert_eq!(warden.phases.len(), 3);
        assert!(BossEncounter::new(warden, EncounterConfig::default()).is_ok());

        let hydra = registry.get("HYDRA").unwrap();
        let barrage = hydra.pattern("Barrage").unwrap();
        assert_eq!(barrage.execution_mode, ExecutionMode::Random);
    }

    #[test]
    fn resolve_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("golem.ron");
        std::fs::write(&path, r#"(name: "Golem", phase_health_thresholds: [0.4])"#).unwrap();

        let registry = BossRegistry::bundled().unwrap();
        let golem = registry.resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(golem.name, "Golem");
        assert_eq!(golem.last_phase(), 1);
    }

    #[test]
    fn resolve_unknown_lists_bundled_names() {
        let registry = BossRegistry::bundled().unwrap();
        let error = registry.resolve("nobody").unwrap_err().to_string();
        assert!(error.contains("Warden"), "{error}");
        assert!(error.contains("Hydra"), "{error}");
    }
}
