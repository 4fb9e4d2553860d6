//! Import use-case service.
//!
//! # Responsibility
//! - Accept new batches: check preconditions, symmetrize kinship, persist
//!   atomically.
//! - Serve read-side views of an import (citizen list, birthday and age
//!   statistics).
//!
//! # Invariants
//! - A rejected batch persists nothing and allocates no visible import.
//! - Statistics are computed over a single consistent snapshot.

use crate::graph::symmetrize_all;
use crate::model::citizen::{Citizen, ImportId};
use crate::repo::citizen_repo::CitizenRepository;
use crate::service::ServiceError;
use crate::stats::birthdays::{birthday_presents, BirthdayReport};
use crate::stats::percentile::{town_age_percentiles, TownPercentiles};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::collections::HashSet;

/// Use-case service over whole imports.
pub struct ImportService<R: CitizenRepository> {
    repo: R,
}

impl<R: CitizenRepository> ImportService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a new batch and returns its allocated import id.
    ///
    /// # Contract
    /// - Rejects empty batches, duplicate ids and self-references before
    ///   touching the kinship graph.
    /// - Relations declared from one side only are completed.
    /// - Any relative id missing from the batch rejects the whole batch.
    pub fn create_import(&mut self, mut citizens: Vec<Citizen>) -> Result<ImportId, ServiceError> {
        if let Err(err) = check_batch(&citizens) {
            warn!("event=import_create module=service status=rejected error={err}");
            return Err(err);
        }

        let repaired = match symmetrize_all(&mut citizens) {
            Ok(repaired) => repaired,
            Err(err) => {
                warn!("event=import_create module=service status=rejected error={err}");
                return Err(err.into());
            }
        };

        let import_id = self.repo.create_import(&citizens)?;
        info!(
            "event=import_create module=service status=ok import_id={} citizens={} repaired_edges={}",
            import_id,
            citizens.len(),
            repaired
        );
        Ok(import_id)
    }

    /// Lists every citizen of an import in batch order.
    pub fn list_citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>, ServiceError> {
        Ok(self.repo.list_citizens(import_id)?)
    }

    /// Per-month gift counts for an import.
    pub fn birthdays(&self, import_id: ImportId) -> Result<BirthdayReport, ServiceError> {
        let citizens = self.repo.list_citizens(import_id)?;
        let report = birthday_presents(&citizens);
        info!(
            "event=stats_birthdays module=service status=ok import_id={} presents={}",
            import_id,
            report.total_presents()
        );
        Ok(report)
    }

    /// Per-town age percentiles as of the local current date.
    pub fn town_age_percentiles(
        &self,
        import_id: ImportId,
    ) -> Result<Vec<TownPercentiles>, ServiceError> {
        self.town_age_percentiles_on(import_id, Local::now().date_naive())
    }

    /// Per-town age percentiles as of `today`.
    ///
    /// An import without citizens yields `EmptyImport`.
    pub fn town_age_percentiles_on(
        &self,
        import_id: ImportId,
        today: NaiveDate,
    ) -> Result<Vec<TownPercentiles>, ServiceError> {
        let citizens = self.repo.list_citizens(import_id)?;
        let report = town_age_percentiles(&citizens, today)
            .ok_or(ServiceError::EmptyImport(import_id))?;
        info!(
            "event=stats_percentiles module=service status=ok import_id={} towns={}",
            import_id,
            report.len()
        );
        Ok(report)
    }
}

fn check_batch(citizens: &[Citizen]) -> Result<(), ServiceError> {
    if citizens.is_empty() {
        return Err(ServiceError::EmptyBatch);
    }

    let mut seen = HashSet::with_capacity(citizens.len());
    for citizen in citizens {
        if !seen.insert(citizen.citizen_id) {
            return Err(ServiceError::DuplicateCitizenId(citizen.citizen_id));
        }
    }

    if let Some(citizen) = citizens.iter().find(|citizen| citizen.is_self_related()) {
        return Err(ServiceError::SelfReference(citizen.citizen_id));
    }

    Ok(())
}
