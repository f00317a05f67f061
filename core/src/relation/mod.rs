//! Relation observations received from peer units.

pub mod store;

pub use store::ObservationStore;
