//! Identifiers for abilities and presentation assets.
//!
//! The core never inspects these beyond equality; the hosts resolve them to
//! concrete ability classes, montages, and effects.

use std::fmt;

/// Identifies an ability class the boss can be granted or activate.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct AbilityRef(String);

impl AbilityRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AbilityRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Handle returned by the ability host for one granted ability instance.
///
/// Two grants of the same [`AbilityRef`] yield distinct handles, which is what
/// lets phase grants be revoked exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityHandle(pub u64);

impl fmt::Display for AbilityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to a montage or visual effect asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
