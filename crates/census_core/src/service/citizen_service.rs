//! Citizen use-case service.
//!
//! # Responsibility
//! - Read single citizens.
//! - Apply partial updates, keeping kinship symmetric when relatives change.
//!
//! # Invariants
//! - A patch runs in one per-import unit of work: on any failure neither the
//!   citizen nor any relative is modified.
//! - Self-references are rejected before any store access.

use crate::graph::{apply_delta, DeltaOutcome};
use crate::model::citizen::{Citizen, CitizenId, CitizenPatch, ImportId};
use crate::repo::citizen_repo::CitizenRepository;
use crate::service::ServiceError;
use log::{info, warn};

/// Use-case service over single citizens.
pub struct CitizenService<R: CitizenRepository> {
    repo: R,
}

impl<R: CitizenRepository> CitizenService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Gets one citizen by its batch-local id.
    pub fn get_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
    ) -> Result<Citizen, ServiceError> {
        if !self.repo.import_exists(import_id)? {
            return Err(ServiceError::ImportNotFound(import_id));
        }
        self.repo
            .get_citizen(import_id, citizen_id)?
            .ok_or(ServiceError::CitizenNotFound {
                import_id,
                citizen_id,
            })
    }

    /// Applies `patch` to one citizen and returns the stored result.
    ///
    /// # Contract
    /// - Fields absent from the patch are kept.
    /// - When `relatives` is set, back-edges of removed relatives are
    ///   dropped and back-edges of added relatives are created.
    /// - `UnknownRelative` leaves every stored record as it was.
    pub fn patch_citizen(
        &mut self,
        import_id: ImportId,
        citizen_id: CitizenId,
        patch: &CitizenPatch,
    ) -> Result<Citizen, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::EmptyPatch);
        }
        if patch
            .relatives
            .as_ref()
            .is_some_and(|relatives| relatives.contains(&citizen_id))
        {
            return Err(ServiceError::SelfReference(citizen_id));
        }

        let result = self.repo.with_import(import_id, |scope| {
            let mut citizen = scope
                .citizen(citizen_id)?
                .ok_or(ServiceError::CitizenNotFound {
                    import_id,
                    citizen_id,
                })?;
            citizen.apply_fields(patch);

            let mut outcome = DeltaOutcome::default();
            if let Some(new_relatives) = &patch.relatives {
                let old_relatives = std::mem::take(&mut citizen.relatives);
                outcome = apply_delta(&mut *scope, citizen_id, &old_relatives, new_relatives)?;
                citizen.relatives = new_relatives.clone();
            }

            scope.save_citizen(&citizen)?;
            Ok::<_, ServiceError>((citizen, outcome))
        });

        match result {
            Ok((citizen, outcome)) => {
                info!(
                    "event=citizen_patch module=service status=ok import_id={} citizen_id={} added_back_edges={} removed_back_edges={}",
                    import_id,
                    citizen_id,
                    outcome.added_back_edges,
                    outcome.removed_back_edges
                );
                Ok(citizen)
            }
            Err(err) => {
                warn!(
                    "event=citizen_patch module=service status=rejected import_id={} citizen_id={} error={}",
                    import_id, citizen_id, err
                );
                Err(err)
            }
        }
    }
}
