//! Error types
//!
//! Every failure the library surfaces falls into one of a small number of
//! categories. Callers match on [`ReconError`] to decide whether a failure is
//! fatal for an enumeration run or a storage problem. A [`NormalizationError`]
//! never leaves a run; it only fails the progress entry of its own type.

use thiserror::Error;

/// Input rejected before any network call or persistence write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No resource types selected")]
    EmptySelection,

    #[error("Resource group name must not be empty")]
    EmptyGroupName,

    #[error("Resource group must contain at least one resource type")]
    EmptyGroupTypes,

    #[error("Resource group {0} not found")]
    GroupNotFound(String),
}

/// A raw payload item could not be mapped onto a canonical resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("{kind}: expected an array in field '{field}'")]
    NotAnArray { kind: String, field: String },

    #[error("{kind}: item is not an object")]
    NotAnObject { kind: String },

    #[error("{kind}: missing required field (one of {candidates})")]
    MissingField { kind: String, candidates: String },
}

/// Top-level error for the crate
#[derive(Error, Debug)]
pub enum ReconError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend rejected the call or could not be reached
    #[error("{0}")]
    Backend(String),

    #[error("Failed to persist resource groups: {0}")]
    Persistence(String),

    #[error("An enumeration is already running for credential {0}")]
    AlreadyRunning(u64),

    #[error("Enumeration cancelled")]
    Cancelled,
}

impl ReconError {
    /// Wrap an internal storage failure
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Fatal errors end the whole enumeration run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_recon_error() {
        let err: ReconError = ValidationError::EmptySelection.into();
        assert!(matches!(
            err,
            ReconError::Validation(ValidationError::EmptySelection)
        ));
        assert_eq!(err.to_string(), "No resource types selected");
    }

    #[test]
    fn test_only_backend_errors_are_fatal() {
        assert!(ReconError::Backend("boom".into()).is_fatal());
        assert!(!ReconError::Cancelled.is_fatal());
        assert!(!ReconError::persistence("disk full").is_fatal());
    }
}
