//! Outbound relation data — what this service tells its peers.
//!
//! Application bundles are published by the leader only. A bundle is
//! emitted when it differs from the last one emitted for the same relation
//! instance; instances that disappear are forgotten so a re-join publishes
//! again.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::render::ServiceValues;
use crate::adapter::{AdapterData, AdapterKind, AdapterSet, RelationSpec};
use crate::types::artifact::ContentHash;
use crate::types::config::OperatorConfig;
use crate::types::observation::Fields;

/// One API endpoint registered with the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub service_name: String,
    pub service_type: String,
    pub description: String,
    /// Path appended to the base URL, e.g. `/v3/$(tenant_id)s`.
    pub path: String,
}

#[derive(Serialize)]
struct EndpointRecord<'a> {
    service_name: &'a str,
    #[serde(rename = "type")]
    service_type: &'a str,
    description: &'a str,
    internal_url: String,
    public_url: String,
    admin_url: String,
}

/// An application bundle to hand to the substrate for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationUpdate {
    pub relation: String,
    pub relation_id: u32,
    pub fields: Fields,
}

pub struct PublishInputs<'a> {
    pub relations: &'a [RelationSpec],
    pub instances: &'a BTreeSet<(String, u32)>,
    pub adapters: &'a AdapterSet,
    pub config: &'a OperatorConfig,
    pub service: &'a ServiceValues,
    pub endpoints: &'a [ServiceEndpoint],
    pub is_leader: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Publisher {
    last: HashMap<(String, u32), ContentHash>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, inputs: &PublishInputs<'_>) -> Vec<RelationUpdate> {
        self.last.retain(|key, _| inputs.instances.contains(key));
        if !inputs.is_leader {
            return Vec::new();
        }

        let mut updates = Vec::new();
        for (relation, relation_id) in inputs.instances {
            let Some(spec) = inputs.relations.iter().find(|s| &s.name == relation) else {
                continue;
            };
            let Some(fields) = payload(spec, inputs) else {
                continue;
            };
            let hash = ContentHash::of_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let key = (relation.clone(), *relation_id);
            if self.last.get(&key) == Some(&hash) {
                continue;
            }
            tracing::info!(relation = %relation, relation_id, "publishing application data");
            self.last.insert(key, hash);
            updates.push(RelationUpdate {
                relation: relation.clone(),
                relation_id: *relation_id,
                fields,
            });
        }
        updates
    }
}

fn payload(spec: &RelationSpec, inputs: &PublishInputs<'_>) -> Option<Fields> {
    let mut fields = Fields::new();
    match &spec.adapter {
        AdapterKind::Database { database } => {
            fields.insert("database".into(), database.clone());
        }
        AdapterKind::Amqp { username, vhost } => {
            fields.insert("username".into(), username.clone());
            fields.insert("vhost".into(), vhost.clone());
        }
        AdapterKind::IdentityService => {
            fields.insert("region".into(), inputs.config.region.clone());
            fields.insert("service-endpoints".into(), service_endpoints(inputs));
        }
        AdapterKind::StorageBackend => {
            let ready = inputs
                .adapters
                .mandatory()
                .filter(|a| a.relation != spec.name)
                .all(|a| a.is_ready());
            fields.insert("ready".into(), ready.to_string());
        }
        AdapterKind::Ingress => return None,
    }
    Some(fields)
}

fn service_endpoints(inputs: &PublishInputs<'_>) -> String {
    let internal = format!("http://{}:{}", inputs.service.name, inputs.service.api_port);
    let public = inputs
        .adapters
        .iter()
        .find_map(|a| match a.data() {
            Some(AdapterData::Ingress(ingress)) => Some(ingress.url.trim_end_matches('/').to_string()),
            _ => None,
        })
        .unwrap_or_else(|| internal.clone());
    let records: Vec<EndpointRecord<'_>> = inputs
        .endpoints
        .iter()
        .map(|e| EndpointRecord {
            service_name: &e.service_name,
            service_type: &e.service_type,
            description: &e.description,
            internal_url: format!("{}{}", internal, e.path),
            public_url: format!("{}{}", public, e.path),
            admin_url: format!("{}{}", internal, e.path),
        })
        .collect();
    serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string())
}
