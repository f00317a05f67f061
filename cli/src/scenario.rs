//! Event scripts replayed by the CLI.
//!
//! ```yaml
//! config:
//!   debug: true
//! events:
//!   - event: container_ready
//!     container: cinder-api
//!   - event: relation_changed
//!     relation: database
//!     relation_id: 2
//!     unit: mysql
//!     fields:
//!       endpoints: 10.0.0.20:3306
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use cinder_operator_core::types::config::OperatorConfig;
use cinder_operator_core::Event;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub config: Option<OperatorConfig>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Script {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let script: Script = serde_yaml::from_str(content).context("invalid event script")?;
        if let Some(config) = &script.config {
            config.validate().context("invalid config in event script")?;
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// The events to deliver, with the script's config as a leading
    /// `config_changed` when present.
    pub fn into_events(self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.events.len() + 1);
        if let Some(config) = self.config {
            events.push(Event::ConfigChanged { config });
        }
        events.extend(self.events);
        events
    }
}
