//! Data-driven boss definitions and loaders.
//!
//! This crate houses the bundled boss catalog and provides loaders for RON/TOML data files:
//! - Boss definitions: thresholds, phase configs and attack patterns (RON)
//! - Encounter configuration: seed, invulnerability tag, ability level (TOML)
//!
//! Definitions are handed to `BossEncounter` at construction and never change afterwards.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{BossLoader, BossRegistry, ConfigLoader, LoadResult};
