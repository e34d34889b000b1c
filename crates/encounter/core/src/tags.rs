//! Gameplay tags used for gating patterns and marking boss state.
//!
//! Tags are dotted names (`State.Enraged.Hard`). A tag satisfies a query tag
//! when it is equal to it or is one of its descendants, so an owner holding
//! `State.Enraged.Hard` matches a requirement on `State.Enraged`.

use std::collections::BTreeSet;
use std::fmt;

/// A single hierarchical gameplay tag.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `self` equals `query` or sits below it in the hierarchy.
    pub fn matches(&self, query: &Tag) -> bool {
        match self.0.strip_prefix(query.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An ordered set of tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<Tag>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.0.remove(tag)
    }

    /// Exact membership, no hierarchy.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    /// Returns true if some tag in the set matches `query` hierarchically.
    pub fn has_tag(&self, query: &Tag) -> bool {
        self.0.iter().any(|tag| tag.matches(query))
    }

    /// Every tag of `query` is matched. An empty query is always satisfied.
    pub fn has_all(&self, query: &TagSet) -> bool {
        query.iter().all(|tag| self.has_tag(tag))
    }

    /// At least one tag of `query` is matched. An empty query never is.
    pub fn has_any(&self, query: &TagSet) -> bool {
        query.iter().any(|tag| self.has_tag(tag))
    }

    pub fn extend(&mut self, other: &TagSet) {
        self.0.extend(other.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(Tag::from).collect())
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::collections::btree_set::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
