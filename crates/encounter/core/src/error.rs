//! Common error infrastructure for encounter-core.
//!
//! Domain-specific errors (`PatternError`, `PhaseError`, ...) live next to the
//! component that detects them. Runtime rejections are never fatal: the
//! operation degrades to a no-op plus a log line, and the error value only
//! tells the caller why nothing happened. Only `DefinitionError`, raised while
//! validating a boss definition, is classified as fatal.

/// Severity level of an error, used for categorization and logging.
///
/// - **Recoverable**: the same request may succeed later (cooldown, busy)
/// - **Validation**: the request can never succeed as issued (unknown name)
/// - **Internal**: a host or configuration is missing
/// - **Fatal**: the definition itself is unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if retrying later may succeed.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if the error points at misconfiguration rather than timing.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all encounter-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
/// - Return a stable snake_case code from [`error_code`](Self::error_code)
pub trait EncounterFault: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert!(ErrorSeverity::Recoverable.is_recoverable());
        assert!(!ErrorSeverity::Validation.is_recoverable());
        assert!(ErrorSeverity::Internal.is_internal());
        assert!(ErrorSeverity::Fatal.is_internal());
        assert!(!ErrorSeverity::Validation.is_internal());
        assert_eq!(ErrorSeverity::Fatal.as_str(), "fatal");
    }

    #[test]
    fn only_definition_errors_are_fatal() {
        use crate::definition::DefinitionError;
        use crate::encounter::EncounterError;
        use crate::executor::PatternError;
        use crate::phase::PhaseError;

        let runtime: [&dyn EncounterFault; 3] = [
            &EncounterError::NotActive,
            &PatternError::NoPatternAvailable,
            &PhaseError::SamePhase(1),
        ];
        for error in runtime {
            assert_ne!(error.severity(), ErrorSeverity::Fatal, "{error}");
        }
        assert_eq!(
            DefinitionError::ThresholdsNotDescending { index: 1 }.severity(),
            ErrorSeverity::Fatal
        );
    }
}
