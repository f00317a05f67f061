use std::fmt;

use serde::{Deserialize, Serialize};

/// Status signal published at the end of every pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "level", content = "detail", rename_all = "snake_case")]
pub enum Status {
    WaitingOnRelation(String),
    WaitingOnContainer(String),
    Active,
    Error(String),
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::WaitingOnRelation(name) => write!(f, "waiting: ({}) integration incomplete", name),
            Status::WaitingOnContainer(name) => write!(f, "waiting: container {} not ready", name),
            Status::Active => write!(f, "active"),
            Status::Error(message) => write!(f, "error: {}", message),
        }
    }
}
