//! End-to-end fights driven through the public `BossEncounter` API.

use std::sync::{Arc, Mutex};

use encounter_core::{
    AbilityHost, AbilityRef, AttackPattern, BossDefinition, BossEncounter, BossHooks,
    EncounterConfig, EncounterError, EncounterEvent, EventLog, ExecutionMode, HealthChange,
    MemoryAbilities, MemoryBoss, PatternError, PhaseConfig, PhaseError, TagSet,
};

fn warden() -> BossDefinition {
    BossDefinition::new("Warden")
        .with_thresholds([0.66, 0.33])
        .with_phase(PhaseConfig::new(1).with_transition(1.5, true))
        .with_phase(PhaseConfig::new(2))
        .with_pattern(
            AttackPattern::new("Slam", ExecutionMode::Sequence)
                .with_abilities([AbilityRef::new("GA_SlamWindup"), AbilityRef::new("GA_SlamImpact")])
                .with_ability_delay(0.5)
                .with_cooldown(5.0),
        )
        .with_pattern(AttackPattern::new("P", ExecutionMode::Single).in_phases([0]))
        .with_pattern(
            AttackPattern::new("Channel", ExecutionMode::Sequence)
                .with_abilities([AbilityRef::new("GA_Beam"), AbilityRef::new("GA_Beam")])
                .with_ability_delay(2.0)
                .interruptible(false),
        )
}

struct Fight {
    encounter: BossEncounter,
    boss: MemoryBoss,
    log: EventLog,
}

impl Fight {
    fn new() -> Self {
        Self::with_definition(warden())
    }

    fn with_definition(definition: BossDefinition) -> Self {
        Self {
            encounter: BossEncounter::new(definition, EncounterConfig::default()).unwrap(),
            boss: MemoryBoss::new(),
            log: EventLog::new(),
        }
    }

    fn start(&mut self) -> Result<(), EncounterError> {
        self.encounter.start_encounter(&mut self.boss.env(&mut self.log))
    }

    fn end(&mut self, defeated: bool) -> Result<(), EncounterError> {
        self.encounter
            .end_encounter(defeated, &mut self.boss.env(&mut self.log))
    }

    fn health(&mut self, old: f32, new: f32) -> Option<u32> {
        self.encounter.on_health_changed(
            HealthChange::new(old, new, 100.0),
            &mut self.boss.env(&mut self.log),
        )
    }

    fn execute(&mut self, name: &str) -> Result<(), PatternError> {
        self.encounter
            .execute_pattern(name, &mut self.boss.env(&mut self.log))
    }

    fn tick(&mut self, dt: f32) {
        self.encounter.tick(dt, &mut self.boss.env(&mut self.log));
    }

    fn count(&self, wanted: &EncounterEvent) -> usize {
        self.log.count(|event| event == wanted)
    }
}

#[test]
fn health_drop_crosses_first_threshold_once() {
    let mut fight = Fight::new();
    fight.start().unwrap();

    assert_eq!(fight.health(100.0, 60.0), Some(1));
    assert_eq!(fight.health(60.0, 58.0), None);
    assert_eq!(fight.health(58.0, 55.0), None);

    assert_eq!(fight.encounter.current_phase(), 1);
    assert_eq!(fight.count(&EncounterEvent::PhaseChanged { old: 0, new: 1 }), 1);
}

#[test]
fn sequence_fires_on_schedule_and_sets_cooldown_at_completion() {
    let mut fight = Fight::new();
    fight.start().unwrap();

    fight.execute("Slam").unwrap();
    assert_eq!(fight.boss.abilities.activations(), &[AbilityRef::new("GA_SlamWindup")]);
    assert!(!fight.encounter.cooldowns().is_on_cooldown("Slam"));

    fight.tick(0.25);
    assert_eq!(fight.boss.abilities.activations().len(), 1);

    fight.tick(0.25);
    assert_eq!(
        fight.boss.abilities.activations(),
        &[AbilityRef::new("GA_SlamWindup"), AbilityRef::new("GA_SlamImpact")]
    );
    assert!(!fight.encounter.is_executing_pattern());
    assert_eq!(fight.encounter.cooldowns().remaining("Slam"), 5.0);
    assert_eq!(
        fight.count(&EncounterEvent::PatternEnded {
            name: "Slam".into(),
            completed: true
        }),
        1
    );
}

#[test]
fn unknown_pattern_is_rejected_silently() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.log.take();

    assert_eq!(
        fight.execute("Unknown"),
        Err(PatternError::UnknownPattern {
            name: "Unknown".into()
        })
    );
    assert!(fight.log.is_empty());
}

#[test]
fn phase_gate_rejects_pattern_outside_valid_phases() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight
        .encounter
        .set_phase(1, &mut fight.boss.env(&mut fight.log))
        .unwrap();

    assert_eq!(
        fight.execute("P"),
        Err(PatternError::InvalidPhase {
            name: "P".into(),
            phase: 1
        })
    );
}

#[test]
fn second_start_is_rejected() {
    let mut fight = Fight::new();
    fight.start().unwrap();

    assert_eq!(fight.start(), Err(EncounterError::AlreadyActive));
    assert_eq!(fight.count(&EncounterEvent::EncounterStarted), 1);
}

#[test]
fn end_without_start_is_rejected() {
    let mut fight = Fight::new();
    assert_eq!(fight.end(false), Err(EncounterError::NotActive));
    assert!(fight.log.is_empty());
}

#[test]
fn threshold_crossed_mid_transition_is_dropped() {
    let mut fight = Fight::new();
    fight.start().unwrap();

    assert_eq!(fight.health(100.0, 60.0), Some(1));
    assert!(fight.encounter.is_transitioning_phase());

    assert_eq!(fight.health(60.0, 20.0), None);
    fight.tick(1.5);
    assert!(!fight.encounter.is_transitioning_phase());
    assert_eq!(fight.encounter.current_phase(), 1);

    // The next change past the threshold picks it up.
    assert_eq!(fight.health(20.0, 19.0), Some(2));
}

#[test]
fn large_drop_skips_straight_to_deepest_phase() {
    let mut fight = Fight::new();
    fight.start().unwrap();

    assert_eq!(fight.health(100.0, 10.0), Some(2));
    assert_eq!(fight.count(&EncounterEvent::PhaseChanged { old: 0, new: 2 }), 1);
}

#[test]
fn transition_round_trip_completes_after_duration() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight
        .encounter
        .set_phase(1, &mut fight.boss.env(&mut fight.log))
        .unwrap();
    assert!(fight.boss.abilities.has_tag("State.Invulnerable"));

    fight.tick(1.5);

    assert_eq!(fight.encounter.current_phase(), 1);
    assert!(!fight.encounter.is_transitioning_phase());
    assert!(!fight.boss.abilities.has_tag("State.Invulnerable"));
    assert_eq!(
        fight.count(&EncounterEvent::PhaseTransitionComplete { phase: 1 }),
        1
    );
}

#[test]
fn transition_completes_after_duration_in_frame_steps() {
    let definition = BossDefinition::new("Sentinel")
        .with_thresholds([0.5])
        .with_phase(PhaseConfig::new(1).with_transition(1.0, true));
    let mut fight = Fight::with_definition(definition);
    fight.start().unwrap();
    let dt = 1.0 / 60.0;
    for _ in 0..7 {
        fight.tick(dt);
    }

    fight
        .encounter
        .set_phase(1, &mut fight.boss.env(&mut fight.log))
        .unwrap();
    for _ in 0..59 {
        fight.tick(dt);
    }
    assert!(fight.encounter.is_transitioning_phase());

    fight.tick(dt);
    assert!(!fight.encounter.is_transitioning_phase());
    assert!(!fight.boss.abilities.has_tag("State.Invulnerable"));
}

#[test]
fn set_phase_rejections() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    let mut env = fight.boss.env(&mut fight.log);

    assert_eq!(
        fight.encounter.set_phase(0, &mut env),
        Err(PhaseError::SamePhase(0))
    );
    fight.encounter.set_phase(2, &mut env).unwrap();
    assert_eq!(
        fight.encounter.set_phase(1, &mut env),
        Err(PhaseError::Regression {
            current: 2,
            requested: 1
        })
    );
}

#[test]
fn uninterruptible_pattern_keeps_running_on_second_call() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.execute("Channel").unwrap();

    assert_eq!(
        fight.execute("Channel"),
        Err(PatternError::NotInterruptible {
            current: "Channel".into()
        })
    );
    assert_eq!(fight.encounter.current_pattern(), Some("Channel"));
    assert_eq!(fight.count(&EncounterEvent::PatternStarted { name: "Channel".into() }), 1);
}

#[test]
fn interruptible_pattern_is_preempted() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.execute("Slam").unwrap();
    fight.execute("P").unwrap();

    assert_eq!(
        fight.count(&EncounterEvent::PatternEnded {
            name: "Slam".into(),
            completed: false
        }),
        1
    );
    assert!(!fight.encounter.cooldowns().is_on_cooldown("Slam"));
}

#[test]
fn end_encounter_leaves_in_flight_work_running() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.execute("Slam").unwrap();
    fight.health(100.0, 50.0);

    fight.end(true).unwrap();
    assert!(fight.encounter.is_executing_pattern());
    assert!(fight.encounter.is_transitioning_phase());

    fight.tick(2.0);
    assert!(!fight.encounter.is_executing_pattern());
    assert!(!fight.encounter.is_transitioning_phase());
    assert_eq!(fight.boss.abilities.activations().len(), 2);
    assert_eq!(fight.count(&EncounterEvent::EncounterEnded { defeated: true }), 1);
}

#[test]
fn health_after_end_does_not_start_transitions() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.health(100.0, 50.0);
    fight.end(true).unwrap();

    assert_eq!(fight.health(50.0, 10.0), None);
    fight.tick(2.0);

    assert_eq!(fight.encounter.current_phase(), 1);
    assert_eq!(fight.encounter.health_fraction(), 0.5);
    assert!(!fight.encounter.is_transitioning_phase());
}

#[test]
fn stopping_a_pattern_skips_its_cooldown() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.execute("Slam").unwrap();

    assert!(
        fight
            .encounter
            .stop_current_pattern(&mut fight.boss.env(&mut fight.log))
    );
    assert!(!fight.encounter.cooldowns().is_on_cooldown("Slam"));
    assert_eq!(fight.execute("Slam"), Ok(()));
}

#[test]
fn cooldown_blocks_until_it_decays() {
    let mut fight = Fight::new();
    fight.start().unwrap();
    fight.execute("Slam").unwrap();
    fight.tick(0.5);

    assert!(matches!(
        fight.execute("Slam"),
        Err(PatternError::OnCooldown { .. })
    ));
    fight.tick(5.01);
    assert!(!fight.encounter.cooldowns().is_on_cooldown("Slam"));
    assert_eq!(fight.encounter.cooldowns().remaining("Slam"), 0.0);
    assert_eq!(fight.execute("Slam"), Ok(()));
}

#[test]
fn cooldown_expires_after_its_duration_in_frame_steps() {
    let definition = BossDefinition::new("Sentinel").with_pattern(
        AttackPattern::new("Jab", ExecutionMode::Single).with_cooldown(0.3),
    );
    let mut fight = Fight::with_definition(definition);
    fight.start().unwrap();
    fight.execute("Jab").unwrap();

    for _ in 0..3 {
        fight.tick(0.1);
    }

    assert_eq!(fight.execute("Jab"), Ok(()));
}

#[test]
fn random_pattern_only_picks_eligible_patterns() {
    let definition = BossDefinition::new("Gatekeeper")
        .with_pattern(
            AttackPattern::new("Enraged", ExecutionMode::Single)
                .requiring(["State.Enraged"].into_iter().collect::<TagSet>()),
        )
        .with_pattern(
            AttackPattern::new("Calm", ExecutionMode::Single)
                .blocked_by(["State.Enraged"].into_iter().collect::<TagSet>())
                .with_cooldown(10.0),
        );
    let mut fight = Fight::with_definition(definition);
    fight.start().unwrap();

    let picked = fight
        .encounter
        .execute_random_pattern(&mut fight.boss.env(&mut fight.log))
        .unwrap();
    assert_eq!(picked, "Calm");

    assert_eq!(
        fight
            .encounter
            .execute_random_pattern(&mut fight.boss.env(&mut fight.log)),
        Err(PatternError::NoPatternAvailable)
    );

    fight.boss.abilities.add_tag("State.Enraged".into());
    let picked = fight
        .encounter
        .execute_random_pattern(&mut fight.boss.env(&mut fight.log))
        .unwrap();
    assert_eq!(picked, "Enraged");
}

#[test]
fn phase_abilities_are_granted_and_revoked_by_handle() {
    let definition = BossDefinition::new("Twin")
        .with_thresholds([0.5, 0.25])
        .with_phase(PhaseConfig::new(1).granting([AbilityRef::new("GA_Fire")]))
        .with_phase(PhaseConfig::new(2));
    let mut fight = Fight::with_definition(definition);
    fight.boss.abilities = MemoryAbilities::new().with_ability("GA_Fire");
    fight.start().unwrap();

    fight.health(100.0, 40.0);
    assert_eq!(fight.boss.abilities.grant_count(&AbilityRef::new("GA_Fire")), 2);

    fight.health(40.0, 20.0);
    assert_eq!(fight.boss.abilities.grant_count(&AbilityRef::new("GA_Fire")), 1);
    assert!(fight.boss.abilities.has_ability(&AbilityRef::new("GA_Fire")));
}

#[derive(Clone, Default)]
struct RecordingHooks {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingHooks {
    fn push(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl BossHooks for RecordingHooks {
    fn on_encounter_start(&mut self) {
        self.push("start".into());
    }

    fn on_encounter_end(&mut self, defeated: bool) {
        self.push(format!("end:{defeated}"));
    }

    fn on_phase_exit(&mut self, phase: u32) {
        self.push(format!("exit:{phase}"));
    }

    fn on_phase_enter(&mut self, phase: u32) {
        self.push(format!("enter:{phase}"));
    }

    fn on_phase_transition_complete(&mut self, phase: u32) {
        self.push(format!("complete:{phase}"));
    }

    fn on_pattern_start(&mut self, pattern: &str) {
        self.push(format!("pattern_start:{pattern}"));
    }

    fn on_pattern_end(&mut self, pattern: &str, completed: bool) {
        self.push(format!("pattern_end:{pattern}:{completed}"));
    }
}

#[test]
fn hooks_fire_at_each_transition_point() {
    let hooks = RecordingHooks::default();
    let calls = Arc::clone(&hooks.calls);
    let mut fight = Fight::new();
    fight.encounter = BossEncounter::new(warden(), EncounterConfig::default())
        .unwrap()
        .with_hooks(hooks);

    fight.start().unwrap();
    fight.execute("P").unwrap();
    fight.health(100.0, 50.0);
    fight.tick(1.5);
    fight.end(true).unwrap();

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "start",
            "pattern_start:P",
            "pattern_end:P:true",
            "exit:0",
            "enter:1",
            "complete:1",
            "end:true",
        ]
    );
}

#[test]
fn same_seed_replays_same_choices() {
    let definition = BossDefinition::new("Dice")
        .with_pattern(AttackPattern::new("A", ExecutionMode::Single))
        .with_pattern(AttackPattern::new("B", ExecutionMode::Single).with_weight(2.0))
        .with_pattern(AttackPattern::new("C", ExecutionMode::Single).with_weight(3.0));

    let run = |seed: u64| {
        let config = EncounterConfig::default().with_seed(seed);
        let mut encounter = BossEncounter::new(definition.clone(), config).unwrap();
        let mut boss = MemoryBoss::new();
        let mut log = EventLog::new();
        (0..20)
            .map(|_| {
                encounter
                    .execute_random_pattern(&mut boss.env(&mut log))
                    .unwrap()
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(11), run(11));
}
