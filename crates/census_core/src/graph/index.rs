//! In-memory kinship index and batch symmetrization.

use super::{GraphError, GraphResult, KinshipStore};
use crate::model::citizen::{Citizen, CitizenId, ImportId, RelativeSet};
use crate::repo::citizen_repo::RepoResult;
use std::collections::HashMap;

/// Relative sets of one import keyed by citizen id.
///
/// Used to repair a batch before it is persisted; lookups are O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativeIndex {
    import_id: ImportId,
    relatives: HashMap<CitizenId, RelativeSet>,
}

impl RelativeIndex {
    pub fn new(import_id: ImportId) -> Self {
        Self {
            import_id,
            relatives: HashMap::new(),
        }
    }

    /// Indexes the declared relatives of every citizen.
    ///
    /// A later duplicate id overwrites an earlier one; batches are checked
    /// for uniqueness before they get here.
    pub fn from_citizens(import_id: ImportId, citizens: &[Citizen]) -> Self {
        let mut index = Self::new(import_id);
        for citizen in citizens {
            index.insert_citizen(citizen.citizen_id, citizen.relatives.clone());
        }
        index
    }

    pub fn insert_citizen(&mut self, citizen_id: CitizenId, relatives: RelativeSet) {
        self.relatives.insert(citizen_id, relatives);
    }

    pub fn relatives(&self, citizen_id: CitizenId) -> Option<&RelativeSet> {
        self.relatives.get(&citizen_id)
    }

    pub fn len(&self) -> usize {
        self.relatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relatives.is_empty()
    }

    /// Returns `true` when every edge has its reverse.
    pub fn is_symmetric(&self) -> bool {
        self.relatives.iter().all(|(owner, relatives)| {
            relatives.iter().all(|relative_id| {
                self.relatives
                    .get(relative_id)
                    .is_some_and(|back| back.contains(owner))
            })
        })
    }

    /// Declares the reverse of every declared edge.
    ///
    /// Returns the number of back-edges that had to be added.
    pub fn symmetrize(&mut self) -> GraphResult<usize> {
        let mut declared: Vec<(CitizenId, CitizenId)> = self
            .relatives
            .iter()
            .flat_map(|(owner, relatives)| relatives.iter().map(move |relative| (*owner, *relative)))
            .collect();
        declared.sort_unstable();

        let mut repaired = 0;
        for (citizen_id, relative_id) in declared {
            let Some(back) = self.relatives.get_mut(&relative_id) else {
                return Err(GraphError::UnknownRelative {
                    citizen_id,
                    relative_id,
                });
            };
            if back.insert(citizen_id) {
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    fn take(&mut self, citizen_id: CitizenId) -> Option<RelativeSet> {
        self.relatives.remove(&citizen_id)
    }
}

impl KinshipStore for RelativeIndex {
    fn import_id(&self) -> ImportId {
        self.import_id
    }

    fn citizen_exists(&self, citizen_id: CitizenId) -> RepoResult<bool> {
        Ok(self.relatives.contains_key(&citizen_id))
    }

    fn insert_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
        Ok(self
            .relatives
            .get_mut(&owner)
            .is_some_and(|relatives| relatives.insert(relative_id)))
    }

    fn remove_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
        Ok(self
            .relatives
            .get_mut(&owner)
            .is_some_and(|relatives| relatives.remove(&relative_id)))
    }
}

/// Makes the kinship relation of a freshly built batch symmetric.
///
/// Declaring an edge from either side is sufficient. On `UnknownRelative`
/// the slice is left exactly as it was passed in.
///
/// Returns the number of back-edges added.
pub fn symmetrize_all(citizens: &mut [Citizen]) -> GraphResult<usize> {
    let mut index = RelativeIndex::from_citizens(0, citizens);
    let repaired = index.symmetrize()?;
    for citizen in citizens.iter_mut() {
        if let Some(relatives) = index.take(citizen.citizen_id) {
            citizen.relatives = relatives;
        }
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::{symmetrize_all, RelativeIndex};
    use crate::graph::GraphError;
    use crate::model::citizen::{Citizen, CitizenId, Gender, RelativeSet};
    use chrono::NaiveDate;

    fn citizen(citizen_id: CitizenId, relatives: &[CitizenId]) -> Citizen {
        Citizen {
            citizen_id,
            town: "Москва".to_string(),
            street: "Льва Толстого".to_string(),
            building: "16к7стр5".to_string(),
            apartment: 7,
            name: format!("citizen {citizen_id}"),
            birth_date: NaiveDate::from_ymd_opt(1986, 12, 26).unwrap(),
            gender: Gender::Male,
            relatives: relatives.iter().copied().collect(),
        }
    }

    fn relatives(citizens: &[Citizen], citizen_id: CitizenId) -> RelativeSet {
        citizens
            .iter()
            .find(|c| c.citizen_id == citizen_id)
            .map(|c| c.relatives.clone())
            .unwrap()
    }

    #[test]
    fn one_sided_declarations_become_symmetric() {
        let mut batch = vec![citizen(1, &[2, 3]), citizen(2, &[]), citizen(3, &[])];
        let repaired = symmetrize_all(&mut batch).unwrap();
        assert_eq!(repaired, 2);
        assert_eq!(relatives(&batch, 2), [1].into_iter().collect());
        assert_eq!(relatives(&batch, 3), [1].into_iter().collect());
        assert!(RelativeIndex::from_citizens(1, &batch).is_symmetric());
    }

    #[test]
    fn symmetric_batch_is_left_untouched() {
        let mut batch = vec![citizen(1, &[2, 3]), citizen(2, &[1, 3]), citizen(3, &[1, 2])];
        let before = batch.clone();
        assert_eq!(symmetrize_all(&mut batch).unwrap(), 0);
        assert_eq!(batch, before);

        assert_eq!(symmetrize_all(&mut batch).unwrap(), 0);
        assert_eq!(batch, before);
    }

    #[test]
    fn unknown_relative_aborts_without_mutation() {
        let mut batch = vec![citizen(1, &[2]), citizen(2, &[5]), citizen(3, &[1])];
        let before = batch.clone();
        let err = symmetrize_all(&mut batch).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownRelative {
                citizen_id: 2,
                relative_id: 5
            }
        ));
        assert_eq!(batch, before);
    }

    #[test]
    fn asymmetric_index_is_detected() {
        let batch = vec![citizen(1, &[2]), citizen(2, &[])];
        let mut index = RelativeIndex::from_citizens(7, &batch);
        assert!(!index.is_symmetric());
        index.symmetrize().unwrap();
        assert!(index.is_symmetric());
        assert_eq!(index.len(), 2);
    }
}
