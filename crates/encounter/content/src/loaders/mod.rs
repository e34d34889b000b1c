//! Content loaders for reading encounter data from files.
//!
//! Boss definitions are RON, encounter configuration is TOML. Both deserialize
//! straight into `encounter-core` types.

pub mod boss;
pub mod config;
pub mod registry;

pub use boss::BossLoader;
pub use config::ConfigLoader;
pub use registry::BossRegistry;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
