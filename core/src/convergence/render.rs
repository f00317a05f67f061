//! Config renderer — adapters + container → rendered artifacts.
//!
//! Rendering is a pure function of the adapter set, the operator config and
//! the container being rendered for. The context is an ordered map and
//! numbers are formatted with plain decimal digits, so identical inputs
//! yield byte-identical content and hashes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::template::{RenderContext, Template};
use crate::adapter::AdapterSet;
use crate::error::ReconcileError;
use crate::types::artifact::RenderedArtifact;
use crate::types::config::OperatorConfig;
use crate::types::container::ContainerTarget;

/// A configuration file and the container it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub name: String,
    pub container: String,
    pub path: String,
    #[serde(skip)]
    pub source: Cow<'static, str>,
}

impl TemplateSpec {
    pub fn embedded(name: &str, container: &str, path: &str, source: &'static str) -> Self {
        TemplateSpec {
            name: name.to_string(),
            container: container.to_string(),
            path: path.to_string(),
            source: Cow::Borrowed(source),
        }
    }
}

/// Service-level values every template may reference under `service.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceValues {
    pub name: String,
    pub api_port: u16,
}

/// Build the render context for one pass.
///
/// Every adapter contributes a flag named after its namespace that is true
/// exactly when it is ready; ready adapters add their values as
/// `<namespace>.<field>`.
pub fn build_context(adapters: &AdapterSet, config: &OperatorConfig, service: &ServiceValues) -> RenderContext {
    let mut ctx = RenderContext::new();
    for adapter in adapters.iter() {
        let namespace = adapter.namespace();
        ctx.flag(namespace.clone(), adapter.is_ready());
        if let Some(data) = adapter.data() {
            for (field, value) in data.context() {
                ctx.text(format!("{}.{}", namespace, field), value);
            }
        }
    }
    ctx.flag("options.debug", config.debug);
    ctx.text("options.region", config.region.clone());
    ctx.text("options.openstack_release", config.openstack_release.clone());
    ctx.text("service.name", service.name.clone());
    ctx.text("service.api_port", service.api_port.to_string());
    ctx
}

/// Templates parsed once, rendered on every pass.
#[derive(Debug, Clone)]
pub struct Renderer {
    templates: Vec<(TemplateSpec, Template)>,
}

impl Renderer {
    pub fn new(specs: &[TemplateSpec]) -> Result<Self, ReconcileError> {
        let templates = specs
            .iter()
            .map(|spec| {
                Template::parse(&spec.source)
                    .map(|t| (spec.clone(), t))
                    .map_err(|source| ReconcileError::Render { template: spec.name.clone(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Renderer { templates })
    }

    /// Render the templates assigned to `container`, in declaration order.
    pub fn render(&self, container: &ContainerTarget, ctx: &RenderContext) -> Result<Vec<RenderedArtifact>, ReconcileError> {
        self.templates
            .iter()
            .filter(|(spec, _)| spec.container == container.name)
            .map(|(spec, template)| {
                let content = template
                    .render(ctx)
                    .map_err(|source| ReconcileError::Render { template: spec.name.clone(), source })?;
                Ok(RenderedArtifact::new(&container.name, &spec.path, content))
            })
            .collect()
    }

    /// Render for every container, in container order.
    pub fn render_all(&self, containers: &[ContainerTarget], ctx: &RenderContext) -> Result<Vec<RenderedArtifact>, ReconcileError> {
        let mut artifacts = Vec::new();
        for container in containers {
            artifacts.extend(self.render(container, ctx)?);
        }
        Ok(artifacts)
    }
}
