//! farmgate-core - Core types and stateless logic for the farm gateway
//!
//! This crate holds everything the gateway does that involves no I/O:
//!
//! - the data model exchanged with the control plane and the UI ([`models`])
//! - the error taxonomy every gateway operation reports ([`GatewayError`])
//! - reconstruction of the compute-node directory from the flat model list ([`registry`])
//! - threshold scoring of a single sensor reading ([`analysis`])
//! - in-memory correlation of task creation and later polls ([`tasks`])
//!
//! Transports live in `farmgate-transport`, the HTTP surface in `farmgate-api`.

pub mod analysis;
pub mod error;
pub mod ids;
pub mod models;
pub mod registry;
pub mod tasks;

pub use analysis::{AnalysisConfig, SensorAnalysisEngine};
pub use error::{GatewayError, GatewayResult};
pub use models::*;
pub use tasks::TaskTracker;
