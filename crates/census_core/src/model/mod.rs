//! Domain model for imports and their citizens.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the external (JSON) shape of citizen records and patches.
//!
//! # Invariants
//! - Every citizen belongs to exactly one import.
//! - Relative ids are scoped to the owner's import.

pub mod citizen;
