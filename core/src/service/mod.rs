//! Service definitions — what the generic controller is parameterized by.
//!
//! A definition lists the containers, templates, consumed relations and
//! post-config commands of one deployable service. The controller holds no
//! service-specific knowledge beyond what is declared here.

pub mod cinder;

use serde::{Deserialize, Serialize};

use crate::adapter::RelationSpec;
use crate::convergence::commands::{CommandGuard, CommandSpec};
use crate::convergence::publish::ServiceEndpoint;
use crate::convergence::render::{ServiceValues, TemplateSpec};
use crate::error::ReconcileError;
use crate::types::container::ContainerRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub role: ContainerRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub api_port: u16,
    pub containers: Vec<ContainerSpec>,
    pub templates: Vec<TemplateSpec>,
    pub relations: Vec<RelationSpec>,
    pub commands: Vec<CommandSpec>,
    pub endpoints: Vec<ServiceEndpoint>,
}

impl ServiceDefinition {
    pub fn service_values(&self) -> ServiceValues {
        ServiceValues {
            name: self.name.clone(),
            api_port: self.api_port,
        }
    }

    /// Check that every cross-reference points at something declared.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let has_container = |name: &str| self.containers.iter().any(|c| c.name == name);
        if self.containers.is_empty() {
            return Err(ReconcileError::Definition("no containers declared".into()));
        }
        for template in &self.templates {
            if !has_container(&template.container) {
                return Err(ReconcileError::Definition(format!(
                    "template {} targets undeclared container {}",
                    template.name, template.container
                )));
            }
        }
        for command in &self.commands {
            if !has_container(&command.container) {
                return Err(ReconcileError::Definition(format!(
                    "command {} targets undeclared container {}",
                    command.name, command.container
                )));
            }
            if command.argv.is_empty() {
                return Err(ReconcileError::Definition(format!("command {} has no argv", command.name)));
            }
            match &command.guard {
                CommandGuard::ArtifactChanged { path } => {
                    let rendered = self
                        .templates
                        .iter()
                        .any(|t| t.container == command.container && &t.path == path);
                    if !rendered {
                        return Err(ReconcileError::Definition(format!(
                            "command {} guards on {} which is not rendered into {}",
                            command.name, path, command.container
                        )));
                    }
                }
                CommandGuard::AdapterChanged { relation } => {
                    if !self.relations.iter().any(|r| &r.name == relation) {
                        return Err(ReconcileError::Definition(format!(
                            "command {} guards on undeclared relation {}",
                            command.name, relation
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
