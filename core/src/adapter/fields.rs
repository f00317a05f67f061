//! Field extraction across the bundles of one relation.
//!
//! Shared fields must agree across every bundle that reports them; per-unit
//! fields are collected. Disagreement is reported as malformed peer data
//! rather than resolved by picking a winner.

use std::collections::BTreeSet;

use crate::error::ReconcileError;
use crate::types::observation::Observation;

pub struct BundleScan<'a> {
    relation: &'a str,
    observations: &'a [Observation],
}

impl<'a> BundleScan<'a> {
    pub fn new(relation: &'a str, observations: &'a [Observation]) -> Self {
        BundleScan { relation, observations }
    }

    pub fn relation(&self) -> &str {
        self.relation
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The single value every reporting bundle agrees on, if any reports it.
    pub fn shared(&self, field: &str) -> Result<Option<String>, ReconcileError> {
        let values: BTreeSet<&str> = self.observations.iter().filter_map(|o| o.get(field)).collect();
        let mut iter = values.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Ok(None),
            (Some(value), None) => Ok(Some((*value).to_string())),
            (Some(_), Some(_)) => Err(self.malformed(format!(
                "units disagree on '{}' ({} distinct values)",
                field,
                values.len()
            ))),
        }
    }

    /// Sorted, de-duplicated values of a per-unit field, ignoring the
    /// application bundle.
    pub fn per_unit(&self, field: &str) -> Vec<String> {
        let values: BTreeSet<&str> = self
            .observations
            .iter()
            .filter(|o| o.unit.contains('/'))
            .filter_map(|o| o.get(field))
            .collect();
        values.into_iter().map(str::to_string).collect()
    }

    /// A shared port field, falling back to `default` when unreported.
    pub fn port(&self, field: &str, default: Option<u16>) -> Result<Option<u16>, ReconcileError> {
        match self.shared(field)? {
            Some(raw) => self.parse_port(field, &raw).map(Some),
            None => Ok(default),
        }
    }

    pub fn parse_port(&self, field: &str, raw: &str) -> Result<u16, ReconcileError> {
        raw.trim()
            .parse::<u16>()
            .map_err(|_| self.malformed(format!("'{}' is not a valid port: {:?}", field, raw)))
    }

    pub fn malformed(&self, detail: String) -> ReconcileError {
        ReconcileError::MalformedPeerData {
            relation: self.relation.to_string(),
            detail,
        }
    }
}

/// Accumulates the names of mandatory fields that were not reported.
#[derive(Debug, Default)]
pub struct Missing(Vec<&'static str>);

impl Missing {
    pub fn require(&mut self, field: &'static str, value: Option<String>) -> String {
        match value {
            Some(v) => v,
            None => {
                self.0.push(field);
                String::new()
            }
        }
    }

    pub fn into_vec(self) -> Vec<&'static str> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::Fields;

    fn obs(unit: &str, pairs: &[(&str, &str)]) -> Observation {
        Observation {
            relation: "database".into(),
            relation_id: 1,
            unit: unit.into(),
            fields: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<Fields>(),
        }
    }

    #[test]
    fn shared_agrees_across_bundles() {
        let observations = vec![
            obs("mysql", &[("username", "cinder")]),
            obs("mysql/0", &[("username", "cinder")]),
            obs("mysql/1", &[]),
        ];
        let scan = BundleScan::new("database", &observations);
        assert_eq!(scan.shared("username").unwrap().as_deref(), Some("cinder"));
        assert_eq!(scan.shared("password").unwrap(), None);
    }

    #[test]
    fn shared_disagreement_is_malformed() {
        let observations = vec![
            obs("mysql/0", &[("password", "a")]),
            obs("mysql/1", &[("password", "b")]),
        ];
        let scan = BundleScan::new("database", &observations);
        let err = scan.shared("password").unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedPeerData { ref relation, .. } if relation == "database"));
    }

    #[test]
    fn per_unit_skips_application_bundle() {
        let observations = vec![
            obs("cinder-ceph", &[("ingress-address", "10.9.9.9")]),
            obs("cinder-ceph/1", &[("ingress-address", "10.0.0.2")]),
            obs("cinder-ceph/0", &[("ingress-address", "10.0.0.1")]),
        ];
        let scan = BundleScan::new("storage-backend", &observations);
        assert_eq!(scan.per_unit("ingress-address"), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn port_defaults_and_validates() {
        let observations = vec![obs("rabbitmq", &[("port", "nope")])];
        let scan = BundleScan::new("amqp", &observations);
        assert!(scan.port("port", Some(5672)).is_err());
        assert_eq!(scan.port("other-port", Some(5672)).unwrap(), Some(5672));
    }
}
