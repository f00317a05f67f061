use serde::{Deserialize, Serialize};

/// Which part of the service a container hosts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRole {
    Api,
    Scheduler,
}

/// A workload container together with its pebble readiness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerTarget {
    pub name: String,
    pub role: ContainerRole,
    pub is_pebble_ready: bool,
}

impl ContainerTarget {
    pub fn new(name: &str, role: ContainerRole) -> Self {
        ContainerTarget {
            name: name.to_string(),
            role,
            is_pebble_ready: false,
        }
    }
}
