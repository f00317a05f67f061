//! Typed adapters, one per relation shape the service understands.

use serde::{Deserialize, Serialize};

use super::fields::{BundleScan, Missing};
use crate::error::ReconcileError;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_AMQP_PORT: u16 = 5672;

/// The relation shapes an adapter can be built from, with the
/// service-specific parameters each one needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterKind {
    StorageBackend,
    Database { database: String },
    Amqp { username: String, vhost: String },
    IdentityService,
    Ingress,
}

/// Outcome of building one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterState {
    /// No participant has joined the relation.
    Absent,
    /// Participants joined but mandatory fields are still missing.
    Incomplete { missing: Vec<&'static str> },
    Ready(AdapterData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterData {
    StorageBackend(StorageBackendAdapter),
    Database(DatabaseAdapter),
    Amqp(AmqpAdapter),
    Identity(IdentityAdapter),
    Ingress(IngressAdapter),
}

impl AdapterData {
    /// Renderable values in a fixed order.
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            AdapterData::StorageBackend(a) => vec![
                ("hosts", a.addresses.join(",")),
                ("count", a.addresses.len().to_string()),
            ],
            AdapterData::Database(a) => vec![
                ("host", a.host.clone()),
                ("port", a.port.to_string()),
                ("username", a.username.clone()),
                ("password", a.password.clone()),
                ("database", a.database.clone()),
                ("connection", a.connection()),
            ],
            AdapterData::Amqp(a) => vec![
                ("host", a.host.clone()),
                ("port", a.port.to_string()),
                ("username", a.username.clone()),
                ("password", a.password.clone()),
                ("vhost", a.vhost.clone()),
                ("transport_url", a.transport_url()),
            ],
            AdapterData::Identity(a) => vec![
                ("www_authenticate_uri", a.public_auth_url()),
                ("auth_url", a.internal_auth_url()),
                ("service_domain", a.service_domain.clone()),
                ("service_project", a.service_project.clone()),
                ("service_user_name", a.service_user_name.clone()),
                ("service_password", a.service_password.clone()),
            ],
            AdapterData::Ingress(a) => vec![("url", a.url.clone())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBackendAdapter {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseAdapter {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl DatabaseAdapter {
    pub fn connection(&self) -> String {
        format!(
            "mysql+pymysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmqpAdapter {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
}

impl AmqpAdapter {
    pub fn transport_url(&self) -> String {
        format!(
            "rabbit://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.vhost
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAdapter {
    pub service_protocol: String,
    pub service_host: String,
    pub service_port: u16,
    pub internal_protocol: String,
    pub internal_host: String,
    pub internal_port: u16,
    pub service_domain: String,
    pub service_project: String,
    pub service_user_name: String,
    pub service_password: String,
}

impl IdentityAdapter {
    pub fn public_auth_url(&self) -> String {
        format!("{}://{}:{}", self.service_protocol, self.service_host, self.service_port)
    }

    pub fn internal_auth_url(&self) -> String {
        format!("{}://{}:{}", self.internal_protocol, self.internal_host, self.internal_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressAdapter {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the adapter state of `kind` from the bundles in `scan`.
pub fn build(kind: &AdapterKind, scan: &BundleScan<'_>) -> Result<AdapterState, ReconcileError> {
    if scan.is_empty() {
        return Ok(AdapterState::Absent);
    }
    match kind {
        AdapterKind::StorageBackend => storage_backend(scan),
        AdapterKind::Database { database } => database_adapter(scan, database),
        AdapterKind::Amqp { username, vhost } => amqp(scan, username, vhost),
        AdapterKind::IdentityService => identity(scan),
        AdapterKind::Ingress => ingress(scan),
    }
}

fn storage_backend(scan: &BundleScan<'_>) -> Result<AdapterState, ReconcileError> {
    let addresses = scan.per_unit("ingress-address");
    if addresses.is_empty() {
        return Ok(AdapterState::Incomplete { missing: vec!["ingress-address"] });
    }
    Ok(AdapterState::Ready(AdapterData::StorageBackend(StorageBackendAdapter { addresses })))
}

fn database_adapter(scan: &BundleScan<'_>, database: &str) -> Result<AdapterState, ReconcileError> {
    let mut missing = Missing::default();
    let endpoints = missing.require("endpoints", scan.shared("endpoints")?);
    let username = missing.require("username", scan.shared("username")?);
    let password = missing.require("password", scan.shared("password")?);
    if !missing.is_empty() {
        return Ok(AdapterState::Incomplete { missing: missing.into_vec() });
    }
    let (host, port) = split_endpoint(scan, &endpoints, DEFAULT_MYSQL_PORT)?;
    Ok(AdapterState::Ready(AdapterData::Database(DatabaseAdapter {
        host,
        port,
        username,
        password,
        database: database.to_string(),
    })))
}

fn amqp(scan: &BundleScan<'_>, username: &str, vhost: &str) -> Result<AdapterState, ReconcileError> {
    let mut missing = Missing::default();
    let host = missing.require("hostname", scan.shared("hostname")?);
    let password = missing.require("password", scan.shared("password")?);
    let port = scan.port("port", Some(DEFAULT_AMQP_PORT))?.unwrap_or(DEFAULT_AMQP_PORT);
    if !missing.is_empty() {
        return Ok(AdapterState::Incomplete { missing: missing.into_vec() });
    }
    Ok(AdapterState::Ready(AdapterData::Amqp(AmqpAdapter {
        host,
        port,
        username: username.to_string(),
        password,
        vhost: vhost.to_string(),
    })))
}

fn identity(scan: &BundleScan<'_>) -> Result<AdapterState, ReconcileError> {
    let mut missing = Missing::default();
    let service_protocol = missing.require("service-protocol", scan.shared("service-protocol")?);
    let service_host = missing.require("service-host", scan.shared("service-host")?);
    let service_port = scan.port("service-port", None)?;
    if service_port.is_none() {
        missing.require("service-port", None);
    }
    let internal_protocol = missing.require("internal-protocol", scan.shared("internal-protocol")?);
    let internal_host = missing.require("internal-host", scan.shared("internal-host")?);
    let internal_port = scan.port("internal-port", None)?;
    if internal_port.is_none() {
        missing.require("internal-port", None);
    }
    let service_domain = missing.require("service-domain", scan.shared("service-domain")?);
    let service_project = missing.require("service-project", scan.shared("service-project")?);
    let service_user_name = missing.require("service-user-name", scan.shared("service-user-name")?);
    let service_password = missing.require("service-password", scan.shared("service-password")?);
    match (service_port, internal_port) {
        (Some(service_port), Some(internal_port)) if missing.is_empty() => {
            Ok(AdapterState::Ready(AdapterData::Identity(IdentityAdapter {
                service_protocol,
                service_host,
                service_port,
                internal_protocol,
                internal_host,
                internal_port,
                service_domain,
                service_project,
                service_user_name,
                service_password,
            })))
        }
        _ => Ok(AdapterState::Incomplete { missing: missing.into_vec() }),
    }
}

fn ingress(scan: &BundleScan<'_>) -> Result<AdapterState, ReconcileError> {
    match scan.shared("url")? {
        Some(url) => Ok(AdapterState::Ready(AdapterData::Ingress(IngressAdapter { url }))),
        None => Ok(AdapterState::Incomplete { missing: vec!["url"] }),
    }
}

/// Split the first entry of a comma-separated endpoint list into host and
/// port. Bracketed IPv6 hosts are accepted.
fn split_endpoint(
    scan: &BundleScan<'_>,
    endpoints: &str,
    default_port: u16,
) -> Result<(String, u16), ReconcileError> {
    let first = endpoints.split(',').next().unwrap_or_default().trim();
    if first.is_empty() {
        return Err(scan.malformed("empty 'endpoints'".into()));
    }
    if let Some(rest) = first.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| scan.malformed(format!("unterminated IPv6 endpoint {:?}", first)))?;
        let port = match tail.strip_prefix(':') {
            Some(raw) => scan.parse_port("endpoints", raw)?,
            None => default_port,
        };
        return Ok((format!("[{}]", host), port));
    }
    match first.rsplit_once(':') {
        Some((host, raw)) => Ok((host.to_string(), scan.parse_port("endpoints", raw)?)),
        None => Ok((first.to_string(), default_port)),
    }
}
