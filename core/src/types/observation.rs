use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key/value bundle published by one participant of a relation.
pub type Fields = BTreeMap<String, String>;

/// Identifies one bundle: `(relation name, relation id, unit id)`.
///
/// The application-level bundle of a relation uses the remote application
/// name (no `/`) as its unit id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    pub relation: String,
    pub relation_id: u32,
    pub unit: String,
}

impl ObservationKey {
    pub fn new(relation: &str, relation_id: u32, unit: &str) -> Self {
        ObservationKey {
            relation: relation.to_string(),
            relation_id,
            unit: unit.to_string(),
        }
    }

    /// Whether this key addresses the application bundle rather than a unit.
    pub fn is_application(&self) -> bool {
        !self.unit.contains('/')
    }
}

/// The latest known bundle for one relation participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub relation: String,
    pub relation_id: u32,
    pub unit: String,
    pub fields: Fields,
}

impl Observation {
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(&self.relation, self.relation_id, &self.unit)
    }

    /// Non-empty value of `field`, if reported.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
