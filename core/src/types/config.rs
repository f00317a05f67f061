use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Operator configuration options, as delivered by `config-changed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OperatorConfig {
    pub debug: bool,
    pub region: String,
    pub openstack_release: String,
    /// Log level for the operator process itself; not rendered.
    pub log_level: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        OperatorConfig {
            debug: false,
            region: "RegionOne".into(),
            openstack_release: "wallaby".into(),
            log_level: "info".into(),
        }
    }
}

impl OperatorConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: OperatorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".into()));
        }
        if self.openstack_release.trim().is_empty() {
            return Err(ConfigError::Invalid("openstack-release must not be empty".into()));
        }
        Ok(())
    }
}
