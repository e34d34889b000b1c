//! In-memory hosts for headless simulation and tests.
//!
//! [`MemoryBoss`] keeps the three host capabilities in separate fields so an
//! [`EncounterEnv`] can borrow all of them at once.

use std::collections::{BTreeMap, BTreeSet};

use crate::ability::{AbilityHandle, AbilityRef, AssetRef};
use crate::definition::StatMultipliers;
use crate::host::{AbilityHost, EncounterEnv, NotificationSink, PresentationHost, StatHost};
use crate::tags::{Tag, TagSet};

/// Ability system with counted loose tags and an activation log.
#[derive(Clone, Debug, Default)]
pub struct MemoryAbilities {
    next_handle: u64,
    grants: BTreeMap<AbilityHandle, (AbilityRef, u32)>,
    loose_tags: BTreeMap<Tag, u32>,
    refused: BTreeSet<AbilityRef>,
    activations: Vec<AbilityRef>,
}

impl MemoryAbilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-grants an ability, as if the boss spawned with it.
    #[must_use]
    pub fn with_ability(mut self, ability: impl Into<AbilityRef>) -> Self {
        self.grant_ability(&ability.into(), 1);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.add_tag(tag.into());
        self
    }

    /// Makes every activation of `ability` fail.
    pub fn refuse(&mut self, ability: impl Into<AbilityRef>) {
        self.refused.insert(ability.into());
    }

    pub fn grant_count(&self, ability: &AbilityRef) -> usize {
        self.grants
            .values()
            .filter(|(granted, _)| granted == ability)
            .count()
    }

    pub fn granted_level(&self, handle: AbilityHandle) -> Option<u32> {
        self.grants.get(&handle).map(|(_, level)| *level)
    }

    /// Successful activations in order.
    pub fn activations(&self) -> &[AbilityRef] {
        &self.activations
    }

    pub fn activation_count(&self, ability: &str) -> usize {
        self.activations
            .iter()
            .filter(|activated| activated.as_str() == ability)
            .count()
    }

    pub fn clear_activations(&mut self) {
        self.activations.clear();
    }

    /// Tags with a positive count.
    pub fn owned_tags(&self) -> TagSet {
        self.loose_tags.keys().cloned().collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.owned_tags().has_tag(&Tag::new(tag))
    }

    pub fn add_tag(&mut self, tag: Tag) {
        *self.loose_tags.entry(tag).or_insert(0) += 1;
    }

    pub fn remove_tag(&mut self, tag: &Tag) {
        if let Some(count) = self.loose_tags.get_mut(tag) {
            *count -= 1;
            if *count == 0 {
                self.loose_tags.remove(tag);
            }
        }
    }
}

impl AbilityHost for MemoryAbilities {
    fn has_ability(&self, ability: &AbilityRef) -> bool {
        self.grants.values().any(|(granted, _)| granted == ability)
    }

    fn try_activate_ability(&mut self, ability: &AbilityRef) -> bool {
        if !self.has_ability(ability) || self.refused.contains(ability) {
            return false;
        }
        self.activations.push(ability.clone());
        true
    }

    fn grant_ability(&mut self, ability: &AbilityRef, level: u32) -> AbilityHandle {
        self.next_handle += 1;
        let handle = AbilityHandle(self.next_handle);
        self.grants.insert(handle, (ability.clone(), level));
        handle
    }

    fn remove_ability(&mut self, handle: AbilityHandle) {
        self.grants.remove(&handle);
    }

    fn find_ability(&self, ability: &AbilityRef) -> Option<AbilityHandle> {
        self.grants
            .iter()
            .find(|(_, (granted, _))| granted == ability)
            .map(|(handle, _)| *handle)
    }

    fn has_all_tags(&self, tags: &TagSet) -> bool {
        self.owned_tags().has_all(tags)
    }

    fn has_any_tags(&self, tags: &TagSet) -> bool {
        self.owned_tags().has_any(tags)
    }

    fn add_loose_tags(&mut self, tags: &TagSet) {
        for tag in tags {
            self.add_tag(tag.clone());
        }
    }

    fn remove_loose_tags(&mut self, tags: &TagSet) {
        for tag in tags {
            self.remove_tag(tag);
        }
    }
}

/// Records montages and effects instead of playing them.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresentation {
    pub montages: Vec<AssetRef>,
    pub effects: Vec<AssetRef>,
}

impl PresentationHost for RecordingPresentation {
    fn play_montage(&mut self, montage: &AssetRef) {
        self.montages.push(montage.clone());
    }

    fn spawn_effect_at_actor(&mut self, effect: &AssetRef) {
        self.effects.push(effect.clone());
    }
}

/// Holds the most recently applied multipliers.
#[derive(Clone, Debug, Default)]
pub struct RecordingStats {
    pub current: StatMultipliers,
    pub applied: usize,
}

impl StatHost for RecordingStats {
    fn apply_multipliers(&mut self, multipliers: StatMultipliers) {
        self.current = multipliers;
        self.applied += 1;
    }
}

/// A headless boss: abilities, presentation and stats in one value.
#[derive(Clone, Debug, Default)]
pub struct MemoryBoss {
    pub abilities: MemoryAbilities,
    pub presentation: RecordingPresentation,
    pub stats: RecordingStats,
}

impl MemoryBoss {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_abilities(mut self, abilities: MemoryAbilities) -> Self {
        self.abilities = abilities;
        self
    }

    /// Borrows every host for one call.
    pub fn env<'a>(&'a mut self, sink: &'a mut dyn NotificationSink) -> EncounterEnv<'a> {
        EncounterEnv::empty()
            .with_abilities(&mut self.abilities)
            .with_presentation(&mut self.presentation)
            .with_stats(&mut self.stats)
            .with_sink(sink)
    }
}
