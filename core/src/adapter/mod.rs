//! Adapter aggregation — typed, validated views over relation observations.
//!
//! Every pass rebuilds all adapters from the observation store; nothing is
//! mutated incrementally. A relation nobody joined yields an adapter that
//! is simply not ready. Only contradictory or unparsable peer data is an
//! error.

pub mod fields;
pub mod kinds;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::relation::ObservationStore;
use crate::types::artifact::ContentHash;

pub use fields::BundleScan;
pub use kinds::{AdapterData, AdapterKind, AdapterState};

/// A relation this service consumes, and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub name: String,
    pub adapter: AdapterKind,
    /// Mandatory relations must be ready before anything is rendered.
    pub mandatory: bool,
}

impl RelationSpec {
    pub fn mandatory(name: &str, adapter: AdapterKind) -> Self {
        RelationSpec { name: name.to_string(), adapter, mandatory: true }
    }

    pub fn optional(name: &str, adapter: AdapterKind) -> Self {
        RelationSpec { name: name.to_string(), adapter, mandatory: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub relation: String,
    pub mandatory: bool,
    pub state: AdapterState,
}

impl Adapter {
    pub fn is_ready(&self) -> bool {
        matches!(self.state, AdapterState::Ready(_))
    }

    pub fn data(&self) -> Option<&AdapterData> {
        match &self.state {
            AdapterState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// Key prefix under which this adapter's values are rendered.
    pub fn namespace(&self) -> String {
        self.relation.replace('-', "_")
    }

    /// Hash of the adapter's rendered values; `None` while not ready.
    pub fn fingerprint(&self) -> Option<ContentHash> {
        let context = self.data()?.context();
        Some(ContentHash::of_pairs(context.iter().map(|(k, v)| (*k, v.as_str()))))
    }
}

/// All adapters of one pass, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterSet {
    adapters: Vec<Adapter>,
}

impl AdapterSet {
    pub fn get(&self, relation: &str) -> Option<&Adapter> {
        self.adapters.iter().find(|a| a.relation == relation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Adapter> {
        self.adapters.iter()
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &Adapter> {
        self.adapters.iter().filter(|a| a.mandatory)
    }

    pub fn is_ready(&self, relation: &str) -> bool {
        self.get(relation).map(Adapter::is_ready).unwrap_or(false)
    }
}

impl FromIterator<Adapter> for AdapterSet {
    fn from_iter<I: IntoIterator<Item = Adapter>>(iter: I) -> Self {
        AdapterSet { adapters: iter.into_iter().collect() }
    }
}

/// Build one adapter per declared relation from the current observations.
pub fn aggregate(
    store: &ObservationStore,
    relations: &[RelationSpec],
) -> Result<AdapterSet, ReconcileError> {
    relations
        .iter()
        .map(|spec| {
            let observations = store.all_units(&spec.name);
            let scan = BundleScan::new(&spec.name, &observations);
            let state = kinds::build(&spec.adapter, &scan)?;
            if let AdapterState::Incomplete { missing } = &state {
                tracing::debug!(relation = %spec.name, ?missing, "adapter incomplete");
            }
            Ok(Adapter {
                relation: spec.name.clone(),
                mandatory: spec.mandatory,
                state,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::Fields;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn specs() -> Vec<RelationSpec> {
        vec![
            RelationSpec::mandatory("storage-backend", AdapterKind::StorageBackend),
            RelationSpec::optional("ingress-public", AdapterKind::Ingress),
        ]
    }

    #[test]
    fn empty_store_yields_unready_adapters() {
        let set = aggregate(&ObservationStore::new(), &specs()).unwrap();
        assert_eq!(set.iter().count(), 2);
        assert!(set.iter().all(|a| !a.is_ready()));
        assert_eq!(set.get("storage-backend").unwrap().state, AdapterState::Absent);
    }

    #[test]
    fn ready_adapter_has_fingerprint() {
        let mut store = ObservationStore::new();
        store.record_observation("storage-backend", 1, "cinder-ceph/0", fields(&[("ingress-address", "10.0.0.1")]));
        let set = aggregate(&store, &specs()).unwrap();
        let adapter = set.get("storage-backend").unwrap();
        assert!(adapter.is_ready());
        assert!(adapter.fingerprint().is_some());
        assert!(set.get("ingress-public").unwrap().fingerprint().is_none());
    }

    #[test]
    fn fingerprint_tracks_data() {
        let mut store = ObservationStore::new();
        store.record_observation("storage-backend", 1, "cinder-ceph/0", fields(&[("ingress-address", "10.0.0.1")]));
        let before = aggregate(&store, &specs()).unwrap().get("storage-backend").unwrap().fingerprint();
        store.record_observation("storage-backend", 1, "cinder-ceph/1", fields(&[("ingress-address", "10.0.0.2")]));
        let after = aggregate(&store, &specs()).unwrap().get("storage-backend").unwrap().fingerprint();
        assert_ne!(before, after);
    }

    #[test]
    fn contradictory_optional_data_is_still_malformed() {
        let mut store = ObservationStore::new();
        store.record_observation("ingress-public", 7, "traefik/0", fields(&[("url", "http://a")]));
        store.record_observation("ingress-public", 7, "traefik/1", fields(&[("url", "http://b")]));
        assert!(matches!(
            aggregate(&store, &specs()),
            Err(ReconcileError::MalformedPeerData { ref relation, .. }) if relation == "ingress-public"
        ));
    }

    #[test]
    fn namespace_uses_underscores() {
        let set = aggregate(&ObservationStore::new(), &specs()).unwrap();
        assert_eq!(set.get("ingress-public").unwrap().namespace(), "ingress_public");
    }
}
