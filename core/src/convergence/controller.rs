//! Reconciliation controller — one pass per inbound event.
//!
//! A pass runs observe → aggregate → gate → render → synchronize → guarded
//! commands → status, to completion, before the next event is looked at.
//! The observation store, applied-artifact record, command markers and
//! publication memory are owned here and mutated by nothing else.

use serde::Serialize;

use super::commands::{run_commands, CommandGuardState, ExecutedCommand, GuardInputs};
use super::gate;
use super::observer::{NoopObserver, PassObserver, PassPhase};
use super::publish::{PublishInputs, Publisher, RelationUpdate};
use super::render::{build_context, Renderer};
use super::sync::{synchronize, AppliedArtifactRecord, SyncOutcome};
use crate::adapter::{aggregate, AdapterSet};
use crate::error::ReconcileError;
use crate::infrastructure::ContainerRuntime;
use crate::relation::ObservationStore;
use crate::service::ServiceDefinition;
use crate::types::artifact::RenderedArtifact;
use crate::types::config::OperatorConfig;
use crate::types::container::ContainerTarget;
use crate::types::event::Event;
use crate::types::status::Status;

/// Everything one pass did, for the substrate and for tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub event: &'static str,
    pub status: Status,
    pub pushed: Vec<(String, String)>,
    pub executed: Vec<ExecutedCommand>,
    pub published: Vec<RelationUpdate>,
}

/// Malformed peer data, latched until the observation store changes.
#[derive(Debug, Clone)]
struct MalformedLatch {
    revision: u64,
    relation: String,
    detail: String,
}

pub struct Controller<O: PassObserver = NoopObserver> {
    definition: ServiceDefinition,
    renderer: Renderer,
    store: ObservationStore,
    containers: Vec<ContainerTarget>,
    config: OperatorConfig,
    is_leader: bool,
    applied: AppliedArtifactRecord,
    guards: CommandGuardState,
    publisher: Publisher,
    malformed: Option<MalformedLatch>,
    status: Status,
    observer: O,
}

impl Controller<NoopObserver> {
    pub fn new(definition: ServiceDefinition) -> Result<Self, ReconcileError> {
        Controller::with_observer(definition, NoopObserver)
    }
}

impl<O: PassObserver> Controller<O> {
    pub fn with_observer(definition: ServiceDefinition, observer: O) -> Result<Self, ReconcileError> {
        definition.validate()?;
        let renderer = Renderer::new(&definition.templates)?;
        let containers = definition
            .containers
            .iter()
            .map(|c| ContainerTarget::new(&c.name, c.role))
            .collect();
        let first_relation = definition
            .relations
            .iter()
            .find(|r| r.mandatory)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        Ok(Controller {
            definition,
            renderer,
            store: ObservationStore::new(),
            containers,
            config: OperatorConfig::default(),
            is_leader: false,
            applied: AppliedArtifactRecord::new(),
            guards: CommandGuardState::new(),
            publisher: Publisher::new(),
            malformed: None,
            status: Status::WaitingOnRelation(first_relation),
            observer,
        })
    }

    /// Apply `event` and run one reconciliation pass.
    pub fn handle(&mut self, event: Event, runtime: &mut dyn ContainerRuntime) -> PassReport {
        let span = tracing::info_span!("reconcile", event = event.kind());
        let _entered = span.enter();
        self.observer.on_event(&event);
        self.observe(&event);
        self.run_pass(event.kind(), runtime)
    }

    /// Apply an event to the controller's state without reconciling.
    pub fn observe(&mut self, event: &Event) {
        match event {
            Event::RelationChanged { relation, relation_id, unit, fields } => {
                if self.store.record_observation(relation, *relation_id, unit, fields.clone()) {
                    tracing::debug!(relation = %relation, relation_id, unit = %unit, "observation updated");
                }
            }
            Event::RelationDeparted { relation, relation_id, unit } => {
                self.store.remove_unit(relation, *relation_id, unit);
            }
            Event::RelationBroken { relation, relation_id } => {
                self.store.remove_relation(relation, *relation_id);
            }
            Event::ContainerReady { container } => {
                match self.containers.iter_mut().find(|c| &c.name == container) {
                    Some(target) => target.is_pebble_ready = true,
                    None => tracing::warn!(container = %container, "ready event for undeclared container"),
                }
            }
            Event::ConfigChanged { config } => match config.validate() {
                Ok(()) => self.config = config.clone(),
                Err(e) => tracing::warn!(error = %e, "ignoring invalid configuration"),
            },
            Event::LeadershipChanged { is_leader } => self.is_leader = *is_leader,
        }
    }

    /// Run one pass against the current state.
    pub fn reconcile(&mut self, runtime: &mut dyn ContainerRuntime) -> PassReport {
        self.run_pass("reconcile", runtime)
    }

    /// Render the current state without applying anything. Container
    /// readiness is ignored; mandatory relations are not.
    pub fn preview(&self) -> Result<Vec<RenderedArtifact>, ReconcileError> {
        let adapters = aggregate(&self.store, &self.definition.relations)?;
        if let Some(adapter) = adapters.mandatory().find(|a| !a.is_ready()) {
            return Err(ReconcileError::IncompleteState { relation: adapter.relation.clone() });
        }
        let ctx = build_context(&adapters, &self.config, &self.definition.service_values());
        let mut artifacts = Vec::new();
        for container in &self.definition.containers {
            let target = ContainerTarget::new(&container.name, container.role);
            artifacts.extend(self.renderer.render(&target, &ctx)?);
        }
        Ok(artifacts)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn containers(&self) -> &[ContainerTarget] {
        &self.containers
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    pub fn applied(&self) -> &AppliedArtifactRecord {
        &self.applied
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    fn run_pass(&mut self, event: &'static str, runtime: &mut dyn ContainerRuntime) -> PassReport {
        let mut report = PassReport {
            event,
            status: Status::Active,
            pushed: Vec::new(),
            executed: Vec::new(),
            published: Vec::new(),
        };

        let status = match self.converge(runtime, &mut report) {
            Ok(status) => status,
            Err(e) => {
                if !e.is_waiting() {
                    tracing::warn!(error = %e, "reconciliation failed");
                }
                e.status()
            }
        };
        self.observer.on_phase(if status.is_active() { PassPhase::Ready } else { PassPhase::Blocked });

        if status != self.status {
            tracing::info!(from = %self.status, to = %status, "status changed");
        }
        self.status = status.clone();
        self.observer.on_status(&status);
        report.status = status;
        report
    }

    fn converge(
        &mut self,
        runtime: &mut dyn ContainerRuntime,
        report: &mut PassReport,
    ) -> Result<Status, ReconcileError> {
        self.observer.on_phase(PassPhase::WaitingRelations);
        let adapters = self.aggregate()?;
        report.published = self.publish(&adapters);

        gate::check(&adapters, &self.containers)?;

        self.observer.on_phase(PassPhase::Rendering);
        let ctx = build_context(&adapters, &self.config, &self.definition.service_values());
        let artifacts = self.renderer.render_all(&self.containers, &ctx)?;
        self.observer.on_render(&artifacts);

        self.observer.on_phase(PassPhase::Applying);
        let mut outcome = SyncOutcome::default();
        let synced = synchronize(&mut self.applied, &artifacts, &self.containers, runtime, &mut outcome);
        report.pushed = outcome.pushed;
        synced?;

        self.observer.on_phase(PassPhase::RunningCommands);
        let inputs = GuardInputs {
            adapters: &adapters,
            applied: &self.applied,
            containers: &self.containers,
            is_leader: self.is_leader,
        };
        let ran = run_commands(&self.definition.commands, &mut self.guards, &inputs, runtime, &mut report.executed);
        ran?;

        match self.containers.iter().find(|c| !c.is_pebble_ready) {
            Some(waiting) => Ok(Status::WaitingOnContainer(waiting.name.clone())),
            None => Ok(Status::Active),
        }
    }

    /// Aggregate adapters, honouring the malformed-data latch.
    fn aggregate(&mut self) -> Result<AdapterSet, ReconcileError> {
        if let Some(latch) = &self.malformed {
            if latch.revision == self.store.revision() {
                return Err(ReconcileError::MalformedPeerData {
                    relation: latch.relation.clone(),
                    detail: latch.detail.clone(),
                });
            }
            self.malformed = None;
        }
        aggregate(&self.store, &self.definition.relations).map_err(|e| {
            if let ReconcileError::MalformedPeerData { relation, detail } = &e {
                tracing::warn!(relation = %relation, detail = %detail, "blocking on malformed peer data");
                self.malformed = Some(MalformedLatch {
                    revision: self.store.revision(),
                    relation: relation.clone(),
                    detail: detail.clone(),
                });
            }
            e
        })
    }

    fn publish(&mut self, adapters: &AdapterSet) -> Vec<RelationUpdate> {
        let instances = self.store.relation_instances();
        let service = self.definition.service_values();
        self.publisher.publish(&PublishInputs {
            relations: &self.definition.relations,
            instances: &instances,
            adapters,
            config: &self.config,
            service: &service,
            endpoints: &self.definition.endpoints,
            is_leader: self.is_leader,
        })
    }

    /// Whether the latest pass found contradictory peer data.
    pub fn is_blocked_on_peer_data(&self) -> bool {
        self.malformed.is_some()
    }
}
