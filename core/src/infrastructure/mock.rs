//! Mock container runtime for testing.
//!
//! Keeps an in-memory filesystem per container, records every call in
//! order and lets tests inject push failures and exec results.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::{ContainerRuntime, ExecOutput};
use crate::error::RuntimeError;

/// One call made against the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RuntimeCall {
    Push { container: String, path: String },
    Pull { container: String, path: String },
    Exec { container: String, argv: Vec<String> },
}

#[derive(Debug, Default)]
pub struct MockRuntime {
    /// File contents keyed by `(container, path)`.
    pub files: BTreeMap<(String, String), String>,
    /// All calls executed against this runtime, in order.
    pub calls: Vec<RuntimeCall>,
    failing_pushes: HashSet<(String, String)>,
    exec_results: HashMap<Vec<String>, ExecOutput>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a file, as if written by an earlier process.
    pub fn with_file(mut self, container: &str, path: &str, content: &str) -> Self {
        self.files.insert((container.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Make pushes to `(container, path)` fail until cleared.
    pub fn fail_push(&mut self, container: &str, path: &str) {
        self.failing_pushes.insert((container.to_string(), path.to_string()));
    }

    pub fn clear_push_failures(&mut self) {
        self.failing_pushes.clear();
    }

    /// Result returned whenever exactly `argv` is executed. Unlisted
    /// commands succeed with empty output.
    pub fn set_exec_result(&mut self, argv: &[&str], output: ExecOutput) {
        self.exec_results.insert(argv.iter().map(|s| s.to_string()).collect(), output);
    }

    pub fn clear_exec_results(&mut self) {
        self.exec_results.clear();
    }

    /// `(container, path)` of every successful push, in order.
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Push { container, path } => Some((container.clone(), path.clone())),
                _ => None,
            })
            .collect()
    }

    /// Distinct pushed paths in first-push order.
    pub fn pushed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for (_, path) in self.pushes() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// argv of every exec, in order.
    pub fn execs(&self) -> Vec<Vec<String>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Exec { argv, .. } => Some(argv.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, container: &str, path: &str) -> Option<&str> {
        self.files
            .get(&(container.to_string(), path.to_string()))
            .map(String::as_str)
    }

    /// Clear all recorded calls, keeping files and injected behaviour.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl ContainerRuntime for MockRuntime {
    fn push(&mut self, container: &str, path: &str, content: &str) -> Result<(), RuntimeError> {
        let key = (container.to_string(), path.to_string());
        if self.failing_pushes.contains(&key) {
            return Err(RuntimeError::Failed(format!("mock: push to {} refused", path)));
        }
        self.files.insert(key, content.to_string());
        self.calls.push(RuntimeCall::Push {
            container: container.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn pull(&mut self, container: &str, path: &str) -> Result<Option<String>, RuntimeError> {
        self.calls.push(RuntimeCall::Pull {
            container: container.to_string(),
            path: path.to_string(),
        });
        Ok(self.file(container, path).map(str::to_string))
    }

    fn exec(&mut self, container: &str, argv: &[String]) -> Result<ExecOutput, RuntimeError> {
        self.calls.push(RuntimeCall::Exec {
            container: container.to_string(),
            argv: argv.to_vec(),
        });
        Ok(self
            .exec_results
            .get(argv)
            .cloned()
            .unwrap_or_else(|| ExecOutput::success("")))
    }
}
