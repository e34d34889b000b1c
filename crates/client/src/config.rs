//! Simulation settings loaded from the environment.
//!
//! `.env` is loaded by the binary before these are read.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one scripted fight.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Bundled boss name or path to a RON definition.
    pub boss: String,
    /// Optional TOML file with encounter settings.
    pub encounter_config: Option<PathBuf>,
    /// Damage dealt to the boss per simulated second.
    pub dps: f32,
    /// Simulated frame length.
    pub frame: Duration,
    /// Fight is abandoned once this much simulated time has passed.
    pub max_seconds: f32,
    /// Sleep one frame between steps instead of running flat out.
    pub realtime: bool,
    /// Log directory name; generated from the clock when unset.
    pub session_id: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            boss: "Warden".to_owned(),
            encounter_config: None,
            dps: 40.0,
            frame: Duration::from_millis(100),
            max_seconds: 120.0,
            realtime: false,
            session_id: None,
        }
    }
}

impl SimConfig {
    /// Reads configuration from process environment variables:
    ///
    /// - `BOSS_DEFINITION`: bundled boss name or RON path
    /// - `ENCOUNTER_CONFIG`: TOML encounter settings
    /// - `SIM_DPS`, `SIM_FRAME_MS`, `SIM_MAX_SECONDS`, `SIM_REALTIME`
    /// - `SIM_SESSION_ID`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let parse = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(boss) = parse("BOSS_DEFINITION") {
            config.boss = boss.trim().to_owned();
        }

        config.encounter_config = parse("ENCOUNTER_CONFIG").map(PathBuf::from);

        if let Some(dps) = parse("SIM_DPS").and_then(|value| value.parse::<f32>().ok())
            && dps.is_finite()
            && dps > 0.0
        {
            config.dps = dps;
        }

        if let Some(ms) = parse("SIM_FRAME_MS").and_then(|value| value.parse::<u64>().ok()) {
            config.frame = Duration::from_millis(ms.max(1));
        }

        if let Some(seconds) = parse("SIM_MAX_SECONDS").and_then(|value| value.parse::<f32>().ok())
            && seconds.is_finite()
            && seconds > 0.0
        {
            config.max_seconds = seconds;
        }

        if let Some(realtime) = parse("SIM_REALTIME") {
            config.realtime = matches!(realtime.trim(), "1" | "true" | "yes");
        }

        config.session_id = parse("SIM_SESSION_ID");

        config
    }

    /// Frame length in simulated seconds.
    pub fn frame_seconds(&self) -> f32 {
        self.frame.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(SimConfig::from_lookup(|_| None), SimConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = SimConfig::from_lookup(lookup(&[
            ("BOSS_DEFINITION", "Hydra"),
            ("ENCOUNTER_CONFIG", "encounter.toml"),
            ("SIM_DPS", "250"),
            ("SIM_FRAME_MS", "50"),
            ("SIM_MAX_SECONDS", "30"),
            ("SIM_REALTIME", "true"),
            ("SIM_SESSION_ID", "run-7"),
        ]));

        assert_eq!(config.boss, "Hydra");
        assert_eq!(config.encounter_config, Some(PathBuf::from("encounter.toml")));
        assert_eq!(config.dps, 250.0);
        assert_eq!(config.frame, Duration::from_millis(50));
        assert_eq!(config.max_seconds, 30.0);
        assert!(config.realtime);
        assert_eq!(config.session_id.as_deref(), Some("run-7"));
    }

    #[test]
    fn invalid_numbers_keep_defaults() {
        let config = SimConfig::from_lookup(lookup(&[
            ("SIM_DPS", "-3"),
            ("SIM_FRAME_MS", "fast"),
            ("SIM_MAX_SECONDS", "NaN"),
        ]));
        let defaults = SimConfig::default();

        assert_eq!(config.dps, defaults.dps);
        assert_eq!(config.frame, defaults.frame);
        assert_eq!(config.max_seconds, defaults.max_seconds);
    }
}
