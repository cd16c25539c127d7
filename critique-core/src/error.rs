//! Errors surfaced at the orchestration boundary.
//!
//! Per-criterion failures never reach this type; they are absorbed inside the
//! orchestrators. Only problems with the subject itself or with the store
//! propagate to callers.

use std::fmt;
use thiserror::Error;

/// Kind of subject a critique call was asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Artifact,
    Requirement,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Artifact => write!(f, "Artifact"),
            SubjectKind::Requirement => write!(f, "Requirement"),
        }
    }
}

/// Errors that abort a whole critique, version or view request
#[derive(Error, Debug)]
pub enum CritiqueError {
    #[error("{kind} not found: {id}")]
    SubjectNotFound { kind: SubjectKind, id: i64 },

    #[error("Unknown quality criterion: {0}")]
    UnknownCriterion(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl CritiqueError {
    pub fn artifact_not_found(id: i64) -> Self {
        CritiqueError::SubjectNotFound {
            kind: SubjectKind::Artifact,
            id,
        }
    }

    pub fn requirement_not_found(id: i64) -> Self {
        CritiqueError::SubjectNotFound {
            kind: SubjectKind::Requirement,
            id,
        }
    }
}
