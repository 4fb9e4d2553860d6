//! Kinship graph consistency engine.
//!
//! # Responsibility
//! - Keep the kinship relation of one import symmetric under batch creation
//!   and single-citizen relative updates.
//! - Express every update as a two-phase diff: compute `RelativeDelta`,
//!   then apply it through a `KinshipStore`.
//!
//! # Invariants
//! - After `symmetrize_all` or a successful `apply_delta`, for every pair
//!   `a, b` in the import: `b ∈ a.relatives ⇔ a ∈ b.relatives`.
//! - Callers reject self-references before invoking either operation.
//! - Removing an already-missing back-edge is not an error.

use crate::model::citizen::{CitizenId, ImportId};
use crate::repo::citizen_repo::{RepoError, RepoResult};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod delta;
pub mod index;

pub use delta::{apply_delta, DeltaOutcome, RelativeDelta};
pub use index::{symmetrize_all, RelativeIndex};

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Failures produced while repairing kinship edges.
#[derive(Debug)]
pub enum GraphError {
    /// `citizen_id` declares `relative_id`, which does not exist in the import.
    UnknownRelative {
        citizen_id: CitizenId,
        relative_id: CitizenId,
    },
    /// Backing store failed while reading or writing an edge.
    Store(RepoError),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRelative {
                citizen_id,
                relative_id,
            } => write!(
                f,
                "citizen {citizen_id} lists unknown relative {relative_id}"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownRelative { .. } => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RepoError> for GraphError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Edge-level view of one import's kinship relation.
///
/// Implementations are scoped to a single import; ids are batch-local.
pub trait KinshipStore {
    /// Import this store is scoped to.
    fn import_id(&self) -> ImportId;
    /// Returns whether `citizen_id` exists in the import.
    fn citizen_exists(&self, citizen_id: CitizenId) -> RepoResult<bool>;
    /// Adds `relative_id` to `owner`'s set. Returns `false` when already present.
    fn insert_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool>;
    /// Removes `relative_id` from `owner`'s set. Returns `false` when absent.
    fn remove_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool>;
}
