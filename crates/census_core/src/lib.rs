//! Core domain logic for census imports.
//! This crate is the single source of truth for kinship invariants and the
//! statistics derived from them.

pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod stats;

pub use config::{ConfigError, CoreConfig, Profile};
pub use graph::{
    apply_delta, symmetrize_all, DeltaOutcome, GraphError, GraphResult, KinshipStore,
    RelativeDelta, RelativeIndex,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::citizen::{Citizen, CitizenId, CitizenPatch, Gender, ImportId, RelativeSet};
pub use repo::citizen_repo::{
    CitizenRepository, ImportScope, RepoError, RepoResult, SqliteCitizenRepository,
};
pub use service::citizen_service::CitizenService;
pub use service::import_service::ImportService;
pub use service::ServiceError;
pub use stats::birthdays::{birthday_presents, BirthdayReport, PresentCount};
pub use stats::percentile::{age_on, percentile, town_age_percentiles, TownPercentiles};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
