//! Convergence engine — turns observed peer state into applied configuration.
//!
//! The `gate` decides whether a pass may render at all, `render` and
//! `template` produce artifacts, `sync` pushes them into containers, and
//! `commands` runs post-config commands behind their guards. The
//! `controller` strings these together, one pass per event.

pub mod commands;
pub mod controller;
pub mod gate;
pub mod observer;
pub mod publish;
pub mod render;
pub mod sync;
pub mod template;

pub use controller::{Controller, PassReport};
pub use observer::{NoopObserver, PassObserver, PassPhase, RecordingObserver};
