//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the citizen store contract consumed by graph and services.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`ImportNotFound`,
//!   `CitizenNotFound`) in addition to DB transport errors.
//! - A unit of work either commits every write or none of them.

pub mod citizen_repo;
