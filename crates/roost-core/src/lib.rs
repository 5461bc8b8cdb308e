//! Registration lifecycle for the Roost client.
//!
//! This crate ties the local marker-file state, the external fact
//! collector, and the remote API clients together into the `Controller`,
//! the state machine behind register, unregister, and check-in. The remote
//! and local signals it consumes are individually weak; the controller's
//! job is to derive a consistent answer from them and to leave the host
//! consistent when any step fails partway.

pub mod collector;
pub mod controller;
pub mod state;
pub mod status;

pub use collector::{ArchiveArtifact, Collector, CollectorError, CommandCollector};
pub use controller::{Controller, Outcome};
pub use state::{LocalState, Markers};
pub use status::RegistrationStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("API error: {0}")]
    Api(#[from] roost_api::ApiError),
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
