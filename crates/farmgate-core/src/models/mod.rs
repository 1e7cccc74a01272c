//! Shared data models for the gateway

mod registry;
mod sensor;
mod task;

pub use registry::*;
pub use sensor::*;
pub use task::*;
