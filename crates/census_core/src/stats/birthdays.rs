//! Per-month gift-recipient counts.
//!
//! # Invariants
//! - The report always carries all twelve months, empty ones included.
//! - One gift is counted per `(citizen, relative)` ordered pair; symmetric
//!   edges therefore count once for each side.
//! - Within a month, recipients keep the order in which they first appeared.

use crate::model::citizen::{Citizen, CitizenId};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

const MONTHS: usize = 12;

/// Number of gifts one recipient receives in a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentCount {
    pub citizen_id: CitizenId,
    pub present: u32,
}

/// Gift recipients for every month of the year.
///
/// Serializes as an object keyed `"1"` through `"12"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthdayReport {
    months: [Vec<PresentCount>; MONTHS],
}

impl BirthdayReport {
    /// Recipients for `month` (`1..=12`), or `None` outside that range.
    pub fn month(&self, month: u32) -> Option<&[PresentCount]> {
        let slot = usize::try_from(month).ok()?.checked_sub(1)?;
        self.months.get(slot).map(Vec::as_slice)
    }

    /// Iterates `(month, recipients)` in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[PresentCount])> {
        (1u32..).zip(self.months.iter().map(Vec::as_slice))
    }

    /// Total number of gifts across the year.
    pub fn total_presents(&self) -> u64 {
        self.months
            .iter()
            .flatten()
            .map(|entry| u64::from(entry.present))
            .sum()
    }
}

impl Serialize for BirthdayReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MONTHS))?;
        for (month, recipients) in self.iter() {
            map.serialize_entry(&month.to_string(), recipients)?;
        }
        map.end()
    }
}

/// Counts, per birth month of the giver, the gifts each relative receives.
pub fn birthday_presents(citizens: &[Citizen]) -> BirthdayReport {
    let mut report = BirthdayReport::default();
    let mut positions: [HashMap<CitizenId, usize>; MONTHS] = Default::default();

    for citizen in citizens {
        // NaiveDate months are always 1..=12.
        let slot = citizen.birth_month() as usize - 1;
        let recipients = &mut report.months[slot];
        for &relative_id in &citizen.relatives {
            match positions[slot].entry(relative_id) {
                Entry::Occupied(position) => recipients[*position.get()].present += 1,
                Entry::Vacant(position) => {
                    position.insert(recipients.len());
                    recipients.push(PresentCount {
                        citizen_id: relative_id,
                        present: 1,
                    });
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{birthday_presents, PresentCount};
    use crate::model::citizen::{Citizen, CitizenId, Gender};
    use chrono::NaiveDate;

    fn citizen(citizen_id: CitizenId, month: u32, relatives: &[CitizenId]) -> Citizen {
        Citizen {
            citizen_id,
            town: "Москва".to_string(),
            street: "Льва Толстого".to_string(),
            building: "16к7стр5".to_string(),
            apartment: 7,
            name: format!("citizen {citizen_id}"),
            birth_date: NaiveDate::from_ymd_opt(1990, month, 15).unwrap(),
            gender: Gender::Female,
            relatives: relatives.iter().copied().collect(),
        }
    }

    fn count(citizen_id: CitizenId, present: u32) -> PresentCount {
        PresentCount {
            citizen_id,
            present,
        }
    }

    #[test]
    fn twelve_month_scenario() {
        let citizens = vec![
            citizen(1, 12, &[2, 3, 4, 5]),
            citizen(2, 4, &[1, 4, 5]),
            citizen(3, 11, &[1]),
            citizen(4, 6, &[1, 2, 5]),
            citizen(5, 6, &[1, 2, 4]),
        ];
        let report = birthday_presents(&citizens);

        assert_eq!(
            report.month(6).unwrap(),
            &[count(1, 2), count(2, 2), count(5, 1), count(4, 1)]
        );
        assert_eq!(report.month(11).unwrap(), &[count(1, 1)]);
        assert_eq!(
            report.month(12).unwrap(),
            &[count(2, 1), count(3, 1), count(4, 1), count(5, 1)]
        );
        assert_eq!(
            report.month(4).unwrap(),
            &[count(1, 1), count(4, 1), count(5, 1)]
        );
        for month in [1, 2, 3, 5, 7, 8, 9, 10] {
            assert!(report.month(month).unwrap().is_empty(), "month {month}");
        }
        assert_eq!(report.total_presents(), 14);
    }

    #[test]
    fn empty_import_still_reports_every_month() {
        let report = birthday_presents(&[]);
        let value = serde_json::to_value(&report).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 12);
        for month in 1..=12 {
            assert_eq!(object[&month.to_string()], serde_json::json!([]));
        }
        assert!(object.get("0").is_none());
        assert!(report.month(0).is_none());
        assert!(report.month(13).is_none());
    }

    #[test]
    fn serializes_recipients_under_month_keys() {
        let report = birthday_presents(&[citizen(1, 3, &[2]), citizen(2, 3, &[1])]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["3"],
            serde_json::json!([
                {"citizen_id": 2, "present": 1},
                {"citizen_id": 1, "present": 1}
            ])
        );
    }
}
