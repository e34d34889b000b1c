//! Unified error types surfaced by the runtime API.
//!
//! Wraps encounter rejections and worker coordination failures so clients
//! can bubble them up with consistent context.
use encounter_core::{
    DefinitionError, EncounterError, EncounterFault, ErrorSeverity, PatternError, PhaseError,
};
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a boss definition before building")]
    MissingDefinition,

    #[error("boss definition rejected")]
    InvalidDefinition(#[source] DefinitionError),

    #[error("{what} must be a finite, non-negative amount (got {value})")]
    InvalidAmount { what: &'static str, value: f32 },

    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Encounter(#[from] EncounterError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl RuntimeError {
    /// Severity of the wrapped encounter rejection. Channel and join
    /// failures mean the worker is gone and are reported as fatal.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Encounter(error) => error.severity(),
            Self::Phase(error) => error.severity(),
            Self::Pattern(error) => error.severity(),
            Self::InvalidDefinition(error) => error.severity(),
            Self::MissingDefinition | Self::InvalidAmount { .. } => ErrorSeverity::Validation,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
        }
    }

    /// True for rejections the encounter may accept later (cooldowns, busy).
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }
}
