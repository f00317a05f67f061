//! Readiness gate — may configuration be attempted at all?

use crate::adapter::AdapterSet;
use crate::error::ReconcileError;
use crate::types::container::ContainerTarget;

/// True when every mandatory adapter is ready and at least one container
/// can accept writes.
pub fn can_configure(adapters: &AdapterSet, containers: &[ContainerTarget]) -> bool {
    check(adapters, containers).is_ok()
}

/// Like [`can_configure`], but names the first blocking condition.
///
/// Mandatory adapters are checked in declaration order before containers.
pub fn check(adapters: &AdapterSet, containers: &[ContainerTarget]) -> Result<(), ReconcileError> {
    if let Some(adapter) = adapters.mandatory().find(|a| !a.is_ready()) {
        return Err(ReconcileError::IncompleteState { relation: adapter.relation.clone() });
    }
    if !containers.iter().any(|c| c.is_pebble_ready) {
        let container = containers.first().map(|c| c.name.clone()).unwrap_or_default();
        return Err(ReconcileError::ContainerUnavailable { container });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Adapter, AdapterData, AdapterState};
    use crate::adapter::kinds::StorageBackendAdapter;
    use crate::types::container::ContainerRole;

    fn adapter(relation: &str, mandatory: bool, ready: bool) -> Adapter {
        let state = if ready {
            AdapterState::Ready(AdapterData::StorageBackend(StorageBackendAdapter {
                addresses: vec!["10.0.0.1".into()],
            }))
        } else {
            AdapterState::Absent
        };
        Adapter { relation: relation.into(), mandatory, state }
    }

    fn containers(ready: &[bool]) -> Vec<ContainerTarget> {
        ready
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut c = ContainerTarget::new(&format!("c{}", i), ContainerRole::Api);
                c.is_pebble_ready = *r;
                c
            })
            .collect()
    }

    #[test]
    fn first_unready_mandatory_adapter_blocks() {
        let set: AdapterSet = vec![
            adapter("storage-backend", true, true),
            adapter("database", true, false),
            adapter("amqp", true, false),
        ]
        .into_iter()
        .collect();
        let err = check(&set, &containers(&[true])).unwrap_err();
        assert!(matches!(err, ReconcileError::IncompleteState { ref relation } if relation == "database"));
    }

    #[test]
    fn optional_adapters_do_not_block() {
        let set: AdapterSet = vec![adapter("storage-backend", true, true), adapter("ingress-public", false, false)]
            .into_iter()
            .collect();
        assert!(can_configure(&set, &containers(&[false, true])));
    }

    #[test]
    fn no_ready_container_blocks() {
        let set: AdapterSet = vec![adapter("storage-backend", true, true)].into_iter().collect();
        let err = check(&set, &containers(&[false, false])).unwrap_err();
        assert!(matches!(err, ReconcileError::ContainerUnavailable { ref container } if container == "c0"));
    }

    #[test]
    fn relations_reported_before_containers() {
        let set: AdapterSet = vec![adapter("storage-backend", true, false)].into_iter().collect();
        assert!(matches!(
            check(&set, &containers(&[false])),
            Err(ReconcileError::IncompleteState { .. })
        ));
    }
}
