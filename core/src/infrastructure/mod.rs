//! Container runtime backends.
//!
//! Provides the `ContainerRuntime` trait the synchronizer and command
//! runner talk to, plus implementations for a local directory tree
//! (`local`) and an in-memory recorder (`mock`).

pub mod local;
pub mod mock;
pub mod runner;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Captured result of a command run inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(stdout: &str) -> Self {
        ExecOutput { exit_code: 0, stdout: stdout.to_string(), stderr: String::new() }
    }

    pub fn failure(exit_code: i32, stderr: &str) -> Self {
        ExecOutput { exit_code, stdout: String::new(), stderr: stderr.to_string() }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Operations the core needs from the workload container runtime.
///
/// Calls are synchronous: a pass blocks until each one returns.
pub trait ContainerRuntime {
    /// Replace the whole file at `path` with `content`.
    fn push(&mut self, container: &str, path: &str, content: &str) -> Result<(), RuntimeError>;

    /// Current content of `path`, or `None` when it does not exist.
    fn pull(&mut self, container: &str, path: &str) -> Result<Option<String>, RuntimeError>;

    /// Run `argv` in the container and capture its output.
    fn exec(&mut self, container: &str, argv: &[String]) -> Result<ExecOutput, RuntimeError>;
}
