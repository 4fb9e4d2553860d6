//! Read-side statistics derived from one import.
//!
//! # Responsibility
//! - Pure computations over a consistent citizen snapshot.
//! - No storage access; services load the snapshot and pass it in.

pub mod birthdays;
pub mod percentile;
