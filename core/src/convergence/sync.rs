//! Container synchronizer — idempotent, hash-compared artifact apply.
//!
//! The applied record maps `(container, path)` to the hash last confirmed
//! in that container. It only advances after a push succeeds (or a pull
//! proves the content is already in place), so a failed write is retried
//! by the next pass.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ReconcileError;
use crate::infrastructure::ContainerRuntime;
use crate::types::artifact::{ContentHash, RenderedArtifact};
use crate::types::container::ContainerTarget;

#[derive(Debug, Clone, Default)]
pub struct AppliedArtifactRecord {
    applied: HashMap<(String, String), ContentHash>,
}

impl AppliedArtifactRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, container: &str, path: &str) -> Option<&ContentHash> {
        self.applied.get(&(container.to_string(), path.to_string()))
    }

    fn record(&mut self, container: &str, path: &str, hash: ContentHash) {
        self.applied.insert((container.to_string(), path.to_string()), hash);
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// What one synchronization did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// `(container, path)` written in this pass.
    pub pushed: Vec<(String, String)>,
    /// Found already in place by `pull` and adopted without writing.
    pub adopted: Vec<(String, String)>,
    /// Containers whose artifacts were skipped because they are not ready.
    pub skipped_containers: Vec<String>,
}

/// Apply `artifacts` to their containers. Stops at the first failed push.
pub fn synchronize(
    record: &mut AppliedArtifactRecord,
    artifacts: &[RenderedArtifact],
    containers: &[ContainerTarget],
    runtime: &mut dyn ContainerRuntime,
    outcome: &mut SyncOutcome,
) -> Result<(), ReconcileError> {
    for artifact in artifacts {
        let ready = containers
            .iter()
            .any(|c| c.name == artifact.container && c.is_pebble_ready);
        if !ready {
            if !outcome.skipped_containers.contains(&artifact.container) {
                tracing::debug!(container = %artifact.container, "container not ready, deferring writes");
                outcome.skipped_containers.push(artifact.container.clone());
            }
            continue;
        }

        match record.get(&artifact.container, &artifact.path) {
            Some(hash) if *hash == artifact.hash => {
                tracing::debug!(container = %artifact.container, path = %artifact.path, "artifact unchanged");
                continue;
            }
            Some(_) => {}
            None => {
                if already_in_place(runtime, artifact) {
                    tracing::info!(
                        container = %artifact.container,
                        path = %artifact.path,
                        hash = %artifact.hash,
                        "adopted existing file"
                    );
                    record.record(&artifact.container, &artifact.path, artifact.hash.clone());
                    outcome.adopted.push((artifact.container.clone(), artifact.path.clone()));
                    continue;
                }
            }
        }

        if let Err(e) = runtime.push(&artifact.container, &artifact.path, &artifact.content) {
            tracing::warn!(container = %artifact.container, path = %artifact.path, error = %e, "push failed");
            return Err(ReconcileError::WriteFailure {
                container: artifact.container.clone(),
                path: artifact.path.clone(),
                reason: e.to_string(),
            });
        }
        tracing::info!(container = %artifact.container, path = %artifact.path, hash = %artifact.hash, "pushed");
        record.record(&artifact.container, &artifact.path, artifact.hash.clone());
        outcome.pushed.push((artifact.container.clone(), artifact.path.clone()));
    }
    Ok(())
}

/// Whether the container already holds exactly this content. A failing
/// pull counts as absent.
fn already_in_place(runtime: &mut dyn ContainerRuntime, artifact: &RenderedArtifact) -> bool {
    match runtime.pull(&artifact.container, &artifact.path) {
        Ok(Some(existing)) => ContentHash::of(existing.as_bytes()) == artifact.hash,
        Ok(None) => false,
        Err(e) => {
            tracing::debug!(container = %artifact.container, path = %artifact.path, error = %e, "pull failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockRuntime;
    use crate::types::container::ContainerRole;

    fn ready(name: &str) -> ContainerTarget {
        let mut c = ContainerTarget::new(name, ContainerRole::Api);
        c.is_pebble_ready = true;
        c
    }

    fn conf(content: &str) -> RenderedArtifact {
        RenderedArtifact::new("cinder-api", "/etc/cinder/cinder.conf", content.to_string())
    }

    #[test]
    fn same_artifact_twice_pushes_once() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new();
        let containers = vec![ready("cinder-api")];
        let mut first = SyncOutcome::default();
        synchronize(&mut record, &[conf("a")], &containers, &mut runtime, &mut first).unwrap();
        let mut second = SyncOutcome::default();
        synchronize(&mut record, &[conf("a")], &containers, &mut runtime, &mut second).unwrap();
        assert_eq!(runtime.pushes().len(), 1);
        assert_eq!(first.pushed.len(), 1);
        assert!(second.pushed.is_empty());
    }

    #[test]
    fn changed_artifact_is_pushed_again() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new();
        let containers = vec![ready("cinder-api")];
        synchronize(&mut record, &[conf("a")], &containers, &mut runtime, &mut SyncOutcome::default()).unwrap();
        synchronize(&mut record, &[conf("b")], &containers, &mut runtime, &mut SyncOutcome::default()).unwrap();
        assert_eq!(runtime.pushes().len(), 2);
        assert_eq!(runtime.file("cinder-api", "/etc/cinder/cinder.conf"), Some("b"));
    }

    #[test]
    fn unready_container_is_skipped() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new();
        let containers = vec![ContainerTarget::new("cinder-api", ContainerRole::Api)];
        let mut outcome = SyncOutcome::default();
        synchronize(&mut record, &[conf("a")], &containers, &mut runtime, &mut outcome).unwrap();
        assert!(runtime.calls.is_empty());
        assert_eq!(outcome.skipped_containers, vec!["cinder-api"]);
        assert!(record.is_empty());
    }

    #[test]
    fn failed_push_keeps_record_and_retries() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new();
        let containers = vec![ready("cinder-api")];
        synchronize(&mut record, &[conf("a")], &containers, &mut runtime, &mut SyncOutcome::default()).unwrap();
        let applied = record.get("cinder-api", "/etc/cinder/cinder.conf").cloned();

        runtime.fail_push("cinder-api", "/etc/cinder/cinder.conf");
        let err = synchronize(&mut record, &[conf("b")], &containers, &mut runtime, &mut SyncOutcome::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::WriteFailure { .. }));
        assert_eq!(record.get("cinder-api", "/etc/cinder/cinder.conf").cloned(), applied);

        runtime.clear_push_failures();
        let mut outcome = SyncOutcome::default();
        synchronize(&mut record, &[conf("b")], &containers, &mut runtime, &mut outcome).unwrap();
        assert_eq!(outcome.pushed.len(), 1);
    }

    #[test]
    fn identical_existing_file_is_adopted() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new().with_file("cinder-api", "/etc/cinder/cinder.conf", "a");
        let mut outcome = SyncOutcome::default();
        synchronize(&mut record, &[conf("a")], &[ready("cinder-api")], &mut runtime, &mut outcome).unwrap();
        assert!(runtime.pushes().is_empty());
        assert_eq!(outcome.adopted.len(), 1);
        assert!(record.get("cinder-api", "/etc/cinder/cinder.conf").is_some());
    }

    #[test]
    fn differing_existing_file_is_overwritten() {
        let mut record = AppliedArtifactRecord::new();
        let mut runtime = MockRuntime::new().with_file("cinder-api", "/etc/cinder/cinder.conf", "stale");
        synchronize(&mut record, &[conf("a")], &[ready("cinder-api")], &mut runtime, &mut SyncOutcome::default()).unwrap();
        assert_eq!(runtime.pushes().len(), 1);
    }
}
