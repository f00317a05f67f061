use serde::{Deserialize, Serialize};

use super::config::OperatorConfig;
use super::observation::Fields;

/// Inbound notification from the event substrate. Each one triggers exactly
/// one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RelationChanged {
        relation: String,
        relation_id: u32,
        unit: String,
        #[serde(default)]
        fields: Fields,
    },
    RelationDeparted {
        relation: String,
        relation_id: u32,
        unit: String,
    },
    RelationBroken {
        relation: String,
        relation_id: u32,
    },
    ContainerReady {
        container: String,
    },
    ConfigChanged {
        #[serde(default)]
        config: OperatorConfig,
    },
    LeadershipChanged {
        is_leader: bool,
    },
}

impl Event {
    /// Short, stable name used in logs and pass reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RelationChanged { .. } => "relation_changed",
            Event::RelationDeparted { .. } => "relation_departed",
            Event::RelationBroken { .. } => "relation_broken",
            Event::ContainerReady { .. } => "container_ready",
            Event::ConfigChanged { .. } => "config_changed",
            Event::LeadershipChanged { .. } => "leadership_changed",
        }
    }
}
