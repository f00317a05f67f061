//! Post-config command runner.
//!
//! Each command carries a guard whose current value is a content hash: the
//! applied hash of an artifact, or the fingerprint of an adapter. The guard
//! state remembers the value at which the command last succeeded; a command
//! runs only when the current value differs. Failures leave the marker
//! untouched so the next pass runs the command again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::sync::AppliedArtifactRecord;
use crate::adapter::AdapterSet;
use crate::error::ReconcileError;
use crate::infrastructure::ContainerRuntime;
use crate::types::artifact::ContentHash;
use crate::types::container::ContainerTarget;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum CommandGuard {
    /// Run when the applied content of `path` in the command's container
    /// changed since the last successful run.
    ArtifactChanged { path: String },
    /// Run when the adapter for `relation` changed since the last
    /// successful run.
    AdapterChanged { relation: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandScope {
    /// Runs on every unit.
    PerUnit,
    /// Cluster-wide effect; runs on the leader only.
    Leader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub container: String,
    pub argv: Vec<String>,
    pub guard: CommandGuard,
    pub scope: CommandScope,
}

impl CommandSpec {
    pub fn new(name: &str, container: &str, argv: &[&str], guard: CommandGuard, scope: CommandScope) -> Self {
        CommandSpec {
            name: name.to_string(),
            container: container.to_string(),
            argv: argv.iter().map(|s| s.to_string()).collect(),
            guard,
            scope,
        }
    }
}

/// Marker per command: the guard value at which it last succeeded.
#[derive(Debug, Clone, Default)]
pub struct CommandGuardState {
    markers: HashMap<String, ContentHash>,
}

impl CommandGuardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, command: &str) -> Option<&ContentHash> {
        self.markers.get(command)
    }
}

/// A command that ran to a zero exit in this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedCommand {
    pub name: String,
    pub container: String,
    pub argv: Vec<String>,
}

/// What the guards are evaluated against.
pub struct GuardInputs<'a> {
    pub adapters: &'a AdapterSet,
    pub applied: &'a AppliedArtifactRecord,
    pub containers: &'a [ContainerTarget],
    pub is_leader: bool,
}

impl GuardInputs<'_> {
    fn current(&self, spec: &CommandSpec) -> Option<ContentHash> {
        match &spec.guard {
            CommandGuard::ArtifactChanged { path } => self.applied.get(&spec.container, path).cloned(),
            CommandGuard::AdapterChanged { relation } => {
                self.adapters.get(relation).and_then(|a| a.fingerprint())
            }
        }
    }
}

/// Run the commands whose guards fire, in declaration order. Stops at the
/// first failure.
pub fn run_commands(
    specs: &[CommandSpec],
    guards: &mut CommandGuardState,
    inputs: &GuardInputs<'_>,
    runtime: &mut dyn ContainerRuntime,
    executed: &mut Vec<ExecutedCommand>,
) -> Result<(), ReconcileError> {
    for spec in specs {
        let container_ready = inputs
            .containers
            .iter()
            .any(|c| c.name == spec.container && c.is_pebble_ready);
        if !container_ready {
            tracing::debug!(command = %spec.name, container = %spec.container, "container not ready, command deferred");
            continue;
        }
        if spec.scope == CommandScope::Leader && !inputs.is_leader {
            tracing::debug!(command = %spec.name, "not leader, skipping");
            continue;
        }
        let Some(current) = inputs.current(spec) else {
            tracing::debug!(command = %spec.name, "guard input not available yet");
            continue;
        };
        if guards.markers.get(&spec.name) == Some(&current) {
            continue;
        }

        tracing::info!(command = %spec.name, container = %spec.container, argv = ?spec.argv, "running command");
        let output = runtime
            .exec(&spec.container, &spec.argv)
            .map_err(|e| ReconcileError::CommandFailure {
                command: spec.name.clone(),
                container: spec.container.clone(),
                exit_code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            })?;
        if !output.is_success() {
            tracing::warn!(
                command = %spec.name,
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "command failed"
            );
            return Err(ReconcileError::CommandFailure {
                command: spec.name.clone(),
                container: spec.container.clone(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        guards.markers.insert(spec.name.clone(), current);
        executed.push(ExecutedCommand {
            name: spec.name.clone(),
            container: spec.container.clone(),
            argv: spec.argv.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::kinds::{AdapterData, AdapterState, StorageBackendAdapter};
    use crate::adapter::Adapter;
    use crate::convergence::sync::{synchronize, SyncOutcome};
    use crate::infrastructure::mock::MockRuntime;
    use crate::infrastructure::ExecOutput;
    use crate::types::artifact::RenderedArtifact;
    use crate::types::container::ContainerRole;

    const SITE: &str = "/etc/apache2/sites-available/wsgi-cinder-api.conf";

    fn specs() -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "enable-site",
                "cinder-api",
                &["a2ensite", "wsgi-cinder-api"],
                CommandGuard::ArtifactChanged { path: SITE.into() },
                CommandScope::PerUnit,
            ),
            CommandSpec::new(
                "db-sync",
                "cinder-api",
                &["cinder-manage", "db", "sync"],
                CommandGuard::AdapterChanged { relation: "database".into() },
                CommandScope::Leader,
            ),
        ]
    }

    fn adapters(address: &str) -> AdapterSet {
        vec![Adapter {
            relation: "database".into(),
            mandatory: true,
            state: AdapterState::Ready(AdapterData::StorageBackend(StorageBackendAdapter {
                addresses: vec![address.into()],
            })),
        }]
        .into_iter()
        .collect()
    }

    fn containers(ready: bool) -> Vec<ContainerTarget> {
        let mut c = ContainerTarget::new("cinder-api", ContainerRole::Api);
        c.is_pebble_ready = ready;
        vec![c]
    }

    fn applied_site(runtime: &mut MockRuntime, content: &str) -> AppliedArtifactRecord {
        let mut record = AppliedArtifactRecord::new();
        let artifact = RenderedArtifact::new("cinder-api", SITE, content.to_string());
        synchronize(&mut record, &[artifact], &containers(true), runtime, &mut SyncOutcome::default()).unwrap();
        record
    }

    fn run(
        guards: &mut CommandGuardState,
        adapters: &AdapterSet,
        applied: &AppliedArtifactRecord,
        ready: bool,
        is_leader: bool,
        runtime: &mut MockRuntime,
    ) -> Result<Vec<ExecutedCommand>, ReconcileError> {
        let containers = containers(ready);
        let inputs = GuardInputs { adapters, applied, containers: &containers, is_leader };
        let mut executed = Vec::new();
        run_commands(&specs(), guards, &inputs, runtime, &mut executed).map(|_| executed)
    }

    #[test]
    fn first_pass_runs_both_in_order() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        let mut guards = CommandGuardState::new();
        let executed = run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        let names: Vec<&str> = executed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["enable-site", "db-sync"]);
    }

    #[test]
    fn unchanged_inputs_do_not_rerun() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        let mut guards = CommandGuardState::new();
        run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        let executed = run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        assert!(executed.is_empty());
        assert_eq!(runtime.execs().len(), 2);
    }

    #[test]
    fn adapter_change_reruns_only_its_command() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        let mut guards = CommandGuardState::new();
        run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        let executed = run(&mut guards, &adapters("b"), &applied, true, true, &mut runtime).unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].name, "db-sync");
    }

    #[test]
    fn leader_only_command_waits_for_leadership() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        let mut guards = CommandGuardState::new();
        let executed = run(&mut guards, &adapters("a"), &applied, true, false, &mut runtime).unwrap();
        assert_eq!(executed.len(), 1);
        assert!(guards.marker("db-sync").is_none());
        let executed = run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].name, "db-sync");
    }

    #[test]
    fn failure_keeps_marker_and_stops() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        runtime.set_exec_result(&["a2ensite", "wsgi-cinder-api"], ExecOutput::failure(1, "apache missing"));
        let mut guards = CommandGuardState::new();
        let err = run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap_err();
        match err {
            ReconcileError::CommandFailure { command, exit_code, stderr, .. } => {
                assert_eq!(command, "enable-site");
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "apache missing");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(guards.marker("enable-site").is_none());
        assert_eq!(runtime.execs().len(), 1);

        runtime.clear_exec_results();
        let executed = run(&mut guards, &adapters("a"), &applied, true, true, &mut runtime).unwrap();
        assert_eq!(executed.len(), 2);
    }

    #[test]
    fn unready_container_defers_everything() {
        let mut runtime = MockRuntime::new();
        let applied = applied_site(&mut runtime, "site");
        let mut guards = CommandGuardState::new();
        let executed = run(&mut guards, &adapters("a"), &applied, false, true, &mut runtime).unwrap();
        assert!(executed.is_empty());
        assert!(runtime.execs().is_empty());
    }
}
