//! Minimal symmetric delta for a single citizen's relative update.

use super::{GraphError, GraphResult, KinshipStore};
use crate::model::citizen::{CitizenId, RelativeSet};
use log::debug;

/// Difference between a citizen's previous and proposed relative sets.
///
/// Edges present in both sets appear in neither list, so re-declaring an
/// existing edge never touches the other side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativeDelta {
    /// `old \ new`, ascending.
    pub removed: Vec<CitizenId>,
    /// `new \ old`, ascending.
    pub added: Vec<CitizenId>,
}

impl RelativeDelta {
    /// Computes the delta from `old` to `new`.
    pub fn between(old: &RelativeSet, new: &RelativeSet) -> Self {
        Self {
            removed: old.difference(new).copied().collect(),
            added: new.difference(old).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Back-edge changes performed by `apply_delta`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaOutcome {
    pub added_back_edges: usize,
    pub removed_back_edges: usize,
}

/// Updates the other side of every changed edge of `citizen_id`.
///
/// Removals run first and tolerate missing relatives or missing back-edges.
/// An added relative that does not exist fails with `UnknownRelative`; edges
/// applied before the failure stay in `store`, so callers run this inside a
/// unit of work they can discard.
///
/// The caller persists `new_relatives` on `citizen_id` itself.
pub fn apply_delta<S: KinshipStore + ?Sized>(
    store: &mut S,
    citizen_id: CitizenId,
    old_relatives: &RelativeSet,
    new_relatives: &RelativeSet,
) -> GraphResult<DeltaOutcome> {
    if old_relatives == new_relatives {
        return Ok(DeltaOutcome::default());
    }

    let delta = RelativeDelta::between(old_relatives, new_relatives);
    let mut outcome = DeltaOutcome::default();

    for &relative_id in &delta.removed {
        if store.citizen_exists(relative_id)? && store.remove_relative(relative_id, citizen_id)? {
            outcome.removed_back_edges += 1;
        }
    }

    for &relative_id in &delta.added {
        if !store.citizen_exists(relative_id)? {
            return Err(GraphError::UnknownRelative {
                citizen_id,
                relative_id,
            });
        }
        if store.insert_relative(relative_id, citizen_id)? {
            outcome.added_back_edges += 1;
        }
    }

    debug!(
        "event=kinship_delta module=graph status=ok import_id={} citizen_id={} removed={} added={}",
        store.import_id(),
        citizen_id,
        outcome.removed_back_edges,
        outcome.added_back_edges
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{apply_delta, DeltaOutcome, RelativeDelta};
    use crate::graph::{GraphError, KinshipStore, RelativeIndex};
    use crate::model::citizen::{CitizenId, ImportId, RelativeSet};
    use crate::repo::citizen_repo::RepoResult;
    use std::cell::Cell;

    fn set(ids: &[CitizenId]) -> RelativeSet {
        ids.iter().copied().collect()
    }

    /// Counts every store access to prove no-op paths stay untouched.
    struct CountingStore {
        inner: RelativeIndex,
        calls: Cell<usize>,
    }

    impl KinshipStore for CountingStore {
        fn import_id(&self) -> ImportId {
            self.inner.import_id()
        }

        fn citizen_exists(&self, citizen_id: CitizenId) -> RepoResult<bool> {
            self.calls.set(self.calls.get() + 1);
            self.inner.citizen_exists(citizen_id)
        }

        fn insert_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
            self.calls.set(self.calls.get() + 1);
            self.inner.insert_relative(owner, relative_id)
        }

        fn remove_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
            self.calls.set(self.calls.get() + 1);
            self.inner.remove_relative(owner, relative_id)
        }
    }

    fn index(entries: &[(CitizenId, &[CitizenId])]) -> RelativeIndex {
        let mut index = RelativeIndex::new(1);
        for (owner, relatives) in entries {
            index.insert_citizen(*owner, set(relatives));
        }
        index
    }

    #[test]
    fn delta_skips_edges_present_on_both_sides() {
        let delta = RelativeDelta::between(&set(&[1, 2, 3]), &set(&[2, 3, 4]));
        assert_eq!(delta.removed, vec![1]);
        assert_eq!(delta.added, vec![4]);
        assert!(RelativeDelta::between(&set(&[5]), &set(&[5])).is_empty());
    }

    #[test]
    fn equal_sets_perform_zero_store_calls() {
        let mut store = CountingStore {
            inner: index(&[(1, &[2]), (2, &[1])]),
            calls: Cell::new(0),
        };
        let outcome = apply_delta(&mut store, 1, &set(&[2]), &set(&[2])).unwrap();
        assert_eq!(outcome, DeltaOutcome::default());
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn replaces_edges_symmetrically() {
        let mut store = index(&[(1, &[2]), (2, &[1]), (3, &[])]);
        let outcome = apply_delta(&mut store, 1, &set(&[2]), &set(&[3])).unwrap();
        assert_eq!(
            outcome,
            DeltaOutcome {
                added_back_edges: 1,
                removed_back_edges: 1,
            }
        );
        assert_eq!(store.relatives(2), Some(&set(&[])));
        assert_eq!(store.relatives(3), Some(&set(&[1])));
    }

    #[test]
    fn missing_back_edge_on_removal_is_tolerated() {
        let mut store = index(&[(1, &[2]), (2, &[])]);
        let outcome = apply_delta(&mut store, 1, &set(&[2, 9]), &set(&[])).unwrap();
        assert_eq!(outcome.removed_back_edges, 0);
        assert_eq!(store.relatives(2), Some(&set(&[])));
    }

    #[test]
    fn unknown_added_relative_fails() {
        let mut store = index(&[(1, &[]), (2, &[])]);
        let err = apply_delta(&mut store, 1, &set(&[]), &set(&[2, 7])).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownRelative {
                citizen_id: 1,
                relative_id: 7
            }
        ));
    }

    #[test]
    fn existing_back_edge_is_not_duplicated() {
        let mut store = index(&[(1, &[]), (2, &[1])]);
        let outcome = apply_delta(&mut store, 1, &set(&[]), &set(&[2])).unwrap();
        assert_eq!(outcome.added_back_edges, 0);
        assert_eq!(store.relatives(2), Some(&set(&[1])));
    }
}
