//! Cinder operator reconciliation core.
//!
//! Consumes relation, container and configuration events, aggregates the
//! peer data into typed adapters, renders the service's configuration and
//! pushes it into the workload containers, then runs the post-config
//! commands that depend on it.
//!
//! # Modules
//!
//! - [`relation`] holds raw per-unit observations
//! - [`adapter`] aggregates them into typed adapters
//! - [`convergence`] gates, renders, synchronizes and runs commands
//! - [`infrastructure`] is the container runtime boundary
//! - [`service`] declares what a concrete service needs

pub mod adapter;
pub mod convergence;
pub mod error;
pub mod infrastructure;
pub mod relation;
pub mod service;
pub mod types;

pub use convergence::{Controller, PassReport};
pub use error::{ConfigError, ReconcileError, RuntimeError, TemplateError};
pub use infrastructure::ContainerRuntime;
pub use types::event::Event;
pub use types::status::Status;
