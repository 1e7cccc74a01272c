//! Application state for the gateway API

use std::sync::Arc;

use farmgate_core::{GatewayError, GatewayResult, SensorAnalysisEngine, TaskTracker};
use farmgate_transport::ConnectionResolver;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ConnectionResolver>,
    pub tracker: Arc<TaskTracker>,
    pub engine: Arc<SensorAnalysisEngine>,
    /// Control-plane address for requests that do not name one
    default_address: Option<String>,
}

impl AppState {
    pub fn new(resolver: ConnectionResolver, engine: SensorAnalysisEngine) -> Self {
        Self {
            resolver: Arc::new(resolver),
            tracker: Arc::new(TaskTracker::new()),
            engine: Arc::new(engine),
            default_address: None,
        }
    }

    pub fn with_default_address(mut self, address: Option<String>) -> Self {
        self.default_address = address.filter(|a| !a.trim().is_empty());
        self
    }

    /// Pick the control-plane address for a request
    pub fn address(&self, requested: Option<&str>) -> GatewayResult<String> {
        requested
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_address.clone())
            .ok_or_else(|| {
                GatewayError::InvalidRequest(
                    "address is required (no default control plane configured)".into(),
                )
            })
    }
}
