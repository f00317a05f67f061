//! Plain data types shared across the reconciliation core.

pub mod artifact;
pub mod config;
pub mod container;
pub mod event;
pub mod observation;
pub mod status;
