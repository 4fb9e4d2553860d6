//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and graph calls into use-case level APIs.
//! - Translate layer errors into the named failures callers map to
//!   "bad request" or "not found".
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Preconditions (non-empty batch, unique ids, no self-reference) are
//!   checked before the graph is invoked.

use crate::graph::GraphError;
use crate::model::citizen::{CitizenId, ImportId};
use crate::repo::citizen_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod citizen_service;
pub mod import_service;

/// Service error for import and citizen use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Batch contains no citizens.
    EmptyBatch,
    /// Two records of one batch share a citizen id.
    DuplicateCitizenId(CitizenId),
    /// Citizen lists its own id as a relative.
    SelfReference(CitizenId),
    /// Declared relative does not exist in the same import.
    UnknownRelative {
        citizen_id: CitizenId,
        relative_id: CitizenId,
    },
    /// Patch sets no field.
    EmptyPatch,
    ImportNotFound(ImportId),
    CitizenNotFound {
        import_id: ImportId,
        citizen_id: CitizenId,
    },
    /// Import holds no citizens to compute statistics over.
    EmptyImport(ImportId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Returns `true` for failures that mean "the addressed resource is absent"
    /// rather than "the request is malformed".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImportNotFound(_) | Self::CitizenNotFound { .. } | Self::EmptyImport(_)
        )
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "import batch has no citizens"),
            Self::DuplicateCitizenId(id) => write!(f, "duplicate citizen id in batch: {id}"),
            Self::SelfReference(id) => write!(f, "citizen {id} lists itself as a relative"),
            Self::UnknownRelative {
                citizen_id,
                relative_id,
            } => write!(
                f,
                "citizen {citizen_id} lists unknown relative {relative_id}"
            ),
            Self::EmptyPatch => write!(f, "patch does not set any field"),
            Self::ImportNotFound(id) => write!(f, "import not found: {id}"),
            Self::CitizenNotFound {
                import_id,
                citizen_id,
            } => write!(f, "citizen {citizen_id} not found in import {import_id}"),
            Self::EmptyImport(id) => write!(f, "import {id} has no citizens"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ImportNotFound(import_id) => Self::ImportNotFound(import_id),
            RepoError::CitizenNotFound {
                import_id,
                citizen_id,
            } => Self::CitizenNotFound {
                import_id,
                citizen_id,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<GraphError> for ServiceError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::UnknownRelative {
                citizen_id,
                relative_id,
            } => Self::UnknownRelative {
                citizen_id,
                relative_id,
            },
            GraphError::Store(err) => err.into(),
        }
    }
}
