use encounter_core::{
    BossDefinition, BossEncounter, CooldownTracker, EncounterConfig, EncounterEnv, HealthChange,
    PhaseConfig,
};
use proptest::prelude::*;

/// Strictly descending thresholds in (0, 1].
fn thresholds() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::btree_set(1u32..=1000, 0..6).prop_map(|set| {
        set.into_iter()
            .rev()
            .map(|millis| millis as f32 / 1000.0)
            .collect()
    })
}

proptest! {
    #[test]
    fn threshold_walk_matches_binary_search(thresholds in thresholds(), fraction in 0.0f32..=1.0) {
        let definition = BossDefinition::new("Prop").with_thresholds(thresholds.clone());
        // Descending thresholds: the phase is the count of thresholds at or above the fraction.
        let expected = thresholds.partition_point(|&threshold| fraction <= threshold) as u32;
        prop_assert_eq!(definition.phase_for_health(fraction), expected);
    }

    #[test]
    fn phase_never_decreases_under_health_loss(
        thresholds in thresholds(),
        hits in prop::collection::vec(0.0f32..30.0, 1..40),
        transition in prop::bool::ANY,
    ) {
        let phases = thresholds.len() as u32;
        let mut definition = BossDefinition::new("Prop").with_thresholds(thresholds);
        if transition {
            for index in 1..=phases {
                definition = definition.with_phase(PhaseConfig::new(index).with_transition(0.5, true));
            }
        }
        let mut encounter = BossEncounter::new(definition, EncounterConfig::default()).unwrap();
        let mut env = EncounterEnv::empty();
        encounter.start_encounter(&mut env).unwrap();

        let mut health = 100.0f32;
        let mut last_phase = 0;
        for hit in hits {
            let next = (health - hit).max(0.0);
            encounter.on_health_changed(HealthChange::new(health, next, 100.0), &mut env);
            encounter.tick(0.2, &mut env);
            health = next;

            let phase = encounter.current_phase();
            prop_assert!(phase >= last_phase);
            prop_assert!(phase <= phases);
            last_phase = phase;
        }
    }

    #[test]
    fn cooldown_expires_after_its_duration(cooldown in 0.01f32..60.0, epsilon in 0.001f32..1.0) {
        let mut cooldowns = CooldownTracker::new();
        cooldowns.set("Slam", cooldown);
        prop_assert!(cooldowns.is_on_cooldown("Slam"));

        cooldowns.tick(cooldown + epsilon);
        prop_assert!(!cooldowns.is_on_cooldown("Slam"));
        prop_assert_eq!(cooldowns.remaining("Slam"), 0.0);
    }

    #[test]
    fn transition_closes_once_frames_cover_its_duration(
        duration in 0.1f32..10.0,
        dt in 0.005f32..0.1,
        lead_in in 0usize..120,
    ) {
        let definition = BossDefinition::new("Prop")
            .with_thresholds([0.5])
            .with_phase(PhaseConfig::new(1).with_transition(duration, true));
        let mut encounter = BossEncounter::new(definition, EncounterConfig::default()).unwrap();
        let mut env = EncounterEnv::empty();
        encounter.start_encounter(&mut env).unwrap();
        for _ in 0..lead_in {
            encounter.tick(dt, &mut env);
        }

        encounter.set_phase(1, &mut env).unwrap();
        let frames = (f64::from(duration) / f64::from(dt)).ceil() as usize;
        for _ in 0..frames {
            encounter.tick(dt, &mut env);
        }
        prop_assert!(!encounter.is_transitioning_phase());
    }
}
