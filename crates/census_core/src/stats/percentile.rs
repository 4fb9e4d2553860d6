//! Per-town age percentiles.
//!
//! # Invariants
//! - Ages are completed years as of `today`.
//! - Percentiles use linear interpolation over the sorted ages.
//! - Reported values are rounded to two decimals; towns are reported in
//!   ascending lexical order.

use crate::model::citizen::Citizen;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Age percentiles of one town.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownPercentiles {
    pub town: String,
    pub p50: f64,
    pub p75: f64,
    pub p99: f64,
}

/// Completed years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years - 1
    } else {
        years
    }
}

/// Linear-interpolation percentile of an ascending slice.
///
/// `p` is in `0.0..=100.0`. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p / 100.0 * last as f64;
    let lower = rank.floor();
    let lower_value = *sorted.get(lower as usize)?;
    let fraction = rank - lower;
    if fraction == 0.0 {
        return Some(lower_value);
    }
    let upper_value = *sorted.get(rank.ceil() as usize)?;
    Some(lower_value + (upper_value - lower_value) * fraction)
}

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Groups citizens by town and reports p50/p75/p99 of their ages.
///
/// Returns `None` when `citizens` is empty.
pub fn town_age_percentiles(citizens: &[Citizen], today: NaiveDate) -> Option<Vec<TownPercentiles>> {
    if citizens.is_empty() {
        return None;
    }

    let mut ages_by_town: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for citizen in citizens {
        ages_by_town
            .entry(citizen.town.as_str())
            .or_default()
            .push(f64::from(age_on(citizen.birth_date, today)));
    }

    ages_by_town
        .into_iter()
        .map(|(town, mut ages)| {
            ages.sort_by(f64::total_cmp);
            Some(TownPercentiles {
                town: town.to_string(),
                p50: round2(percentile(&ages, 50.0)?),
                p75: round2(percentile(&ages, 75.0)?),
                p99: round2(percentile(&ages, 99.0)?),
            })
        })
        .collect()
}
