//! Pass observer hooks.
//!
//! The controller reports each pass transition to a `PassObserver`. The
//! default implementation ignores everything; `RecordingObserver` keeps a
//! log for tests and replay tooling.

use serde::Serialize;

use crate::types::artifact::RenderedArtifact;
use crate::types::event::Event;
use crate::types::status::Status;

/// Phase of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassPhase {
    WaitingRelations,
    Rendering,
    Applying,
    RunningCommands,
    Ready,
    Blocked,
}

pub trait PassObserver {
    fn on_event(&mut self, _event: &Event) {}
    fn on_phase(&mut self, _phase: PassPhase) {}
    fn on_render(&mut self, _artifacts: &[RenderedArtifact]) {}
    fn on_status(&mut self, _status: &Status) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PassObserver for NoopObserver {}

#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    /// Kinds of the events seen, in order.
    pub events: Vec<&'static str>,
    pub phases: Vec<PassPhase>,
    /// `(container, path)` of every render, one entry per pass that rendered.
    pub renders: Vec<Vec<(String, String)>>,
    pub statuses: Vec<Status>,
}

impl PassObserver for RecordingObserver {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.kind());
    }

    fn on_phase(&mut self, phase: PassPhase) {
        self.phases.push(phase);
    }

    fn on_render(&mut self, artifacts: &[RenderedArtifact]) {
        self.renders.push(
            artifacts
                .iter()
                .map(|a| (a.container.clone(), a.path.clone()))
                .collect(),
        );
    }

    fn on_status(&mut self, status: &Status) {
        self.statuses.push(status.clone());
    }
}
