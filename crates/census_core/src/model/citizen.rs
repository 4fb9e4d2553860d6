//! Citizen domain model.
//!
//! # Responsibility
//! - Define the canonical citizen record owned by one import.
//! - Define the partial-update shape applied by the citizen service.
//!
//! # Invariants
//! - `citizen_id` is unique within its import, not globally.
//! - `relatives` never contains the owning citizen's own id.
//! - Kinship is symmetric: `b ∈ a.relatives ⇔ a ∈ b.relatives`.
//!
//! # See also
//! - crate::graph for the symmetry repair logic.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Store-allocated identifier of one import batch.
pub type ImportId = i64;

/// Batch-local citizen identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type CitizenId = i64;

/// Set of relative ids, scoped to the same import as the owner.
///
/// Ordered so listings and aggregations are deterministic.
pub type RelativeSet = BTreeSet<CitizenId>;

/// External date format used by batch payloads (`DD.MM.YYYY`).
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";

/// Citizen gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Stable lowercase label shared by JSON and SQLite storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Parses the stable lowercase label.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

/// One person record within exactly one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub citizen_id: CitizenId,
    pub town: String,
    pub street: String,
    pub building: String,
    pub apartment: i64,
    pub name: String,
    /// Serialized as `DD.MM.YYYY`.
    #[serde(with = "birth_date_format")]
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub relatives: RelativeSet,
}

impl Citizen {
    /// Month component of `birth_date`, in `1..=12`.
    pub fn birth_month(&self) -> u32 {
        self.birth_date.month()
    }

    /// Returns whether this citizen lists itself as a relative.
    pub fn is_self_related(&self) -> bool {
        self.relatives.contains(&self.citizen_id)
    }

    /// Copies every field set in `patch` except `relatives`.
    ///
    /// Relatives go through the kinship graph and are assigned by the caller
    /// once the back-edges have been applied.
    pub fn apply_fields(&mut self, patch: &CitizenPatch) {
        if let Some(town) = &patch.town {
            self.town = town.clone();
        }
        if let Some(street) = &patch.street {
            self.street = street.clone();
        }
        if let Some(building) = &patch.building {
            self.building = building.clone();
        }
        if let Some(apartment) = patch.apartment {
            self.apartment = apartment;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
    }
}

/// Partial update for one existing citizen.
///
/// `citizen_id` is deliberately absent: ids are immutable, and unknown fields
/// are rejected on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitizenPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_birth_date_format"
    )]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relatives: Option<RelativeSet>,
}

impl CitizenPatch {
    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.town.is_none()
            && self.street.is_none()
            && self.building.is_none()
            && self.apartment.is_none()
            && self.name.is_none()
            && self.birth_date.is_none()
            && self.gender.is_none()
            && self.relatives.is_none()
    }
}

mod birth_date_format {
    use super::BIRTH_DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(BIRTH_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, BIRTH_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

mod optional_birth_date_format {
    use super::BIRTH_DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.collect_str(&date.format(BIRTH_DATE_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| {
            NaiveDate::parse_from_str(&value, BIRTH_DATE_FORMAT).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::{Citizen, CitizenPatch, Gender};
    use chrono::NaiveDate;

    fn sample() -> Citizen {
        Citizen {
            citizen_id: 1,
            town: "Москва".to_string(),
            street: "Льва Толстого".to_string(),
            building: "16к7стр5".to_string(),
            apartment: 7,
            name: "Иванов Иван Иванович".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1986, 12, 26).unwrap(),
            gender: Gender::Male,
            relatives: [3, 2].into_iter().collect(),
        }
    }

    #[test]
    fn citizen_serializes_external_date_and_sorted_relatives() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["birth_date"], "26.12.1986");
        assert_eq!(value["gender"], "male");
        assert_eq!(value["relatives"], serde_json::json!([2, 3]));
    }

    #[test]
    fn citizen_rejects_iso_birth_date() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["birth_date"] = serde_json::json!("1986-12-26");
        assert!(serde_json::from_value::<Citizen>(value).is_err());
    }

    #[test]
    fn patch_rejects_citizen_id_field() {
        let err = serde_json::from_str::<CitizenPatch>(r#"{"citizen_id": 3, "name": "x"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn patch_decodes_partial_fields() {
        let patch: CitizenPatch =
            serde_json::from_str(r#"{"birth_date": "01.04.1997", "relatives": [5, 4]}"#).unwrap();
        assert_eq!(patch.birth_date, NaiveDate::from_ymd_opt(1997, 4, 1));
        assert_eq!(patch.relatives, Some([4, 5].into_iter().collect()));
        assert!(patch.name.is_none());
        assert!(!patch.is_empty());
        assert!(CitizenPatch::default().is_empty());
    }

    #[test]
    fn apply_fields_leaves_relatives_to_caller() {
        let mut citizen = sample();
        let patch = CitizenPatch {
            town: Some("Керчь".to_string()),
            gender: Some(Gender::Female),
            relatives: Some([9].into_iter().collect()),
            ..CitizenPatch::default()
        };
        citizen.apply_fields(&patch);
        assert_eq!(citizen.town, "Керчь");
        assert_eq!(citizen.gender, Gender::Female);
        assert_eq!(citizen.relatives, [2, 3].into_iter().collect());
    }

    #[test]
    fn gender_labels_round_trip() {
        assert_eq!(Gender::parse(Gender::Female.as_str()), Some(Gender::Female));
        assert_eq!(Gender::parse("other"), None);
    }
}
