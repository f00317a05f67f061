//! The Cinder block-storage API and scheduler service.

use crate::adapter::{AdapterKind, RelationSpec};
use crate::convergence::commands::{CommandGuard, CommandScope, CommandSpec};
use crate::convergence::publish::ServiceEndpoint;
use crate::convergence::render::TemplateSpec;
use crate::types::container::ContainerRole;

use super::{ContainerSpec, ServiceDefinition};

pub const API_CONTAINER: &str = "cinder-api";
pub const SCHEDULER_CONTAINER: &str = "cinder-scheduler";

pub const CINDER_CONF: &str = "/etc/cinder/cinder.conf";
pub const WSGI_SITE: &str = "wsgi-cinder-api";
pub const WSGI_SITE_CONF: &str = "/etc/apache2/sites-available/wsgi-cinder-api.conf";

pub const API_PORT: u16 = 8776;

const CINDER_CONF_TEMPLATE: &str = include_str!("../../templates/cinder.conf.j2");
const WSGI_SITE_TEMPLATE: &str = include_str!("../../templates/wsgi-cinder-api.conf.j2");

pub fn definition() -> ServiceDefinition {
    ServiceDefinition {
        name: "cinder".into(),
        api_port: API_PORT,
        containers: vec![
            ContainerSpec { name: API_CONTAINER.into(), role: ContainerRole::Api },
            ContainerSpec { name: SCHEDULER_CONTAINER.into(), role: ContainerRole::Scheduler },
        ],
        templates: vec![
            TemplateSpec::embedded("cinder.conf", API_CONTAINER, CINDER_CONF, CINDER_CONF_TEMPLATE),
            TemplateSpec::embedded(WSGI_SITE, API_CONTAINER, WSGI_SITE_CONF, WSGI_SITE_TEMPLATE),
            TemplateSpec::embedded("cinder.conf", SCHEDULER_CONTAINER, CINDER_CONF, CINDER_CONF_TEMPLATE),
        ],
        relations: vec![
            RelationSpec::mandatory("storage-backend", AdapterKind::StorageBackend),
            RelationSpec::mandatory("database", AdapterKind::Database { database: "cinder".into() }),
            RelationSpec::mandatory(
                "amqp",
                AdapterKind::Amqp { username: "cinder".into(), vhost: "openstack".into() },
            ),
            RelationSpec::mandatory("identity-service", AdapterKind::IdentityService),
            RelationSpec::optional("ingress-public", AdapterKind::Ingress),
        ],
        commands: vec![
            CommandSpec::new(
                "enable-site",
                API_CONTAINER,
                &["a2ensite", WSGI_SITE],
                CommandGuard::ArtifactChanged { path: WSGI_SITE_CONF.into() },
                CommandScope::PerUnit,
            ),
            CommandSpec::new(
                "db-sync",
                API_CONTAINER,
                &["sudo", "-u", "cinder", "cinder-manage", "--config-dir", "/etc/cinder", "db", "sync"],
                CommandGuard::AdapterChanged { relation: "database".into() },
                CommandScope::Leader,
            ),
        ],
        endpoints: vec![
            ServiceEndpoint {
                service_name: "cinderv2".into(),
                service_type: "volumev2".into(),
                description: "Cinder Volume Service v2".into(),
                path: "/v2/$(tenant_id)s".into(),
            },
            ServiceEndpoint {
                service_name: "cinderv3".into(),
                service_type: "volumev3".into(),
                description: "Cinder Volume Service v3".into(),
                path: "/v3/$(tenant_id)s".into(),
            },
        ],
    }
}
