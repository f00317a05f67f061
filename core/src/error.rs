//! Error types for the reconciliation core.
//!
//! `ReconcileError` follows the failure taxonomy of a pass: every variant
//! maps onto the status signal the controller publishes, and none of them
//! is ever turned into a process crash.

use thiserror::Error;

use crate::types::status::Status;

/// Why a reconciliation pass stopped short of `active`.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A mandatory adapter is not ready yet.
    #[error("relation {relation} is not ready")]
    IncompleteState { relation: String },

    /// Peers published missing or contradictory data.
    #[error("malformed data on relation {relation}: {detail}")]
    MalformedPeerData { relation: String, detail: String },

    /// No container is able to accept writes yet.
    #[error("container {container} is not ready")]
    ContainerUnavailable { container: String },

    /// The container runtime rejected a push.
    #[error("failed to write {path} in {container}: {reason}")]
    WriteFailure {
        container: String,
        path: String,
        reason: String,
    },

    /// A post-config command exited non-zero or could not be started.
    #[error("command {command} failed in {container} (exit {exit_code}): {stderr}")]
    CommandFailure {
        command: String,
        container: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The service definition references something it does not declare.
    #[error("invalid service definition: {0}")]
    Definition(String),

    /// A template could not be rendered from the current context.
    #[error("failed to render {template}: {source}")]
    Render {
        template: String,
        #[source]
        source: TemplateError,
    },
}

impl ReconcileError {
    /// The status signal this failure is reported as.
    pub fn status(&self) -> Status {
        match self {
            ReconcileError::IncompleteState { relation } => {
                Status::WaitingOnRelation(relation.clone())
            }
            ReconcileError::ContainerUnavailable { container } => {
                Status::WaitingOnContainer(container.clone())
            }
            other => Status::Error(other.to_string()),
        }
    }

    /// Whether the failure is transient and simply waits for the next event.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            ReconcileError::IncompleteState { .. } | ReconcileError::ContainerUnavailable { .. }
        )
    }
}

/// Faults in a template or in the context it is rendered against.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown key '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    #[error("unterminated '{open}' on line {line}")]
    Unterminated { open: &'static str, line: usize },

    #[error("unsupported tag '{tag}' on line {line}")]
    UnsupportedTag { tag: String, line: usize },

    #[error("'endif' without 'if' on line {line}")]
    UnbalancedEndif { line: usize },

    #[error("'if {key}' opened on line {line} is never closed")]
    UnclosedIf { key: String, line: usize },
}

/// Failures reported by a container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown container {0}")]
    UnknownContainer(String),

    #[error("I/O error on {path} in {container}: {source}")]
    Io {
        container: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

/// Failures loading operator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
