//! Notifications emitted by the encounter for HUD, audio and analytics.

/// A state-machine notification, delivered to the [`NotificationSink`] in the
/// order the transitions happen.
///
/// [`NotificationSink`]: crate::host::NotificationSink
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncounterEvent {
    EncounterStarted,
    EncounterEnded { defeated: bool },
    PhaseChanged { old: u32, new: u32 },
    PhaseTransitionComplete { phase: u32 },
    PatternStarted { name: String },
    /// `completed` is false when the pattern was stopped or pre-empted.
    PatternEnded { name: String, completed: bool },
}

impl EncounterEvent {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EncounterStarted => "encounter_started",
            Self::EncounterEnded { .. } => "encounter_ended",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::PhaseTransitionComplete { .. } => "phase_transition_complete",
            Self::PatternStarted { .. } => "pattern_started",
            Self::PatternEnded { .. } => "pattern_ended",
        }
    }

    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::EncounterStarted | Self::EncounterEnded { .. })
    }

    pub const fn is_phase(&self) -> bool {
        matches!(
            self,
            Self::PhaseChanged { .. } | Self::PhaseTransitionComplete { .. }
        )
    }

    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::PatternStarted { .. } | Self::PatternEnded { .. })
    }
}
