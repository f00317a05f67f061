//! Observation store — latest bundle per `(relation, relation id, unit)`.
//!
//! Writes are last-write-wins. Reads return owned snapshots sorted by key,
//! so anything derived from one read is deterministic. A revision counter
//! advances on every write that actually changes stored data.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::observation::{Fields, Observation, ObservationKey};

#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    bundles: BTreeMap<ObservationKey, Fields>,
    revision: u64,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the bundle for a participant. Returns whether stored data
    /// changed.
    pub fn record_observation(
        &mut self,
        relation: &str,
        relation_id: u32,
        unit: &str,
        fields: Fields,
    ) -> bool {
        let key = ObservationKey::new(relation, relation_id, unit);
        if self.bundles.get(&key) == Some(&fields) {
            return false;
        }
        self.bundles.insert(key, fields);
        self.revision += 1;
        true
    }

    /// All bundles currently held for `relation`, across relation ids.
    pub fn all_units(&self, relation: &str) -> Vec<Observation> {
        self.bundles
            .iter()
            .filter(|(key, _)| key.relation == relation)
            .map(|(key, fields)| Observation {
                relation: key.relation.clone(),
                relation_id: key.relation_id,
                unit: key.unit.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    /// Drop a departed participant. Returns whether anything was removed.
    pub fn remove_unit(&mut self, relation: &str, relation_id: u32, unit: &str) -> bool {
        let removed = self
            .bundles
            .remove(&ObservationKey::new(relation, relation_id, unit))
            .is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// Drop every bundle of one relation instance. Returns how many were removed.
    pub fn remove_relation(&mut self, relation: &str, relation_id: u32) -> usize {
        let before = self.bundles.len();
        self.bundles
            .retain(|key, _| !(key.relation == relation && key.relation_id == relation_id));
        let removed = before - self.bundles.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Known relation instances as `(relation name, relation id)`.
    pub fn relation_instances(&self) -> BTreeSet<(String, u32)> {
        self.bundles
            .keys()
            .map(|key| (key.relation.clone(), key.relation_id))
            .collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
