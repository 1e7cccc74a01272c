//! Mock strategy for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use farmgate_core::{GatewayError, GatewayResult};
use parking_lot::RwLock;
use serde_json::{json, Value};

use super::TransportStrategy;
use crate::operation::Operation;

/// Scripted strategy: answers from a per-operation table
pub struct MockStrategy {
    available: AtomicBool,
    calls: AtomicUsize,
    responses: RwLock<HashMap<Operation, GatewayResult<Value>>>,
    last_params: RwLock<Option<Value>>,
}

impl Default for MockStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStrategy {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            responses: RwLock::new(Self::default_responses()),
            last_params: RwLock::new(None),
        }
    }

    /// Script the answer for an operation
    pub fn respond(&self, op: Operation, response: GatewayResult<Value>) {
        self.responses.write().insert(op, response);
    }

    /// Toggle whether the probe succeeds
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls that reached this strategy
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<Value> {
        self.last_params.read().clone()
    }

    fn default_responses() -> HashMap<Operation, GatewayResult<Value>> {
        HashMap::from([
            (
                Operation::HealthCheck,
                Ok(json!({"healthy": true, "message": "ok"})),
            ),
            (Operation::GetAvailableModels, Ok(json!({"models": []}))),
        ])
    }
}

#[async_trait]
impl TransportStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn probe(&self, _op: Operation) -> GatewayResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::ConfigurationError(
                "mock marked unavailable".into(),
            ))
        }
    }

    async fn call(
        &self,
        _address: &str,
        op: Operation,
        params: &Value,
        _deadline: Duration,
    ) -> GatewayResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.write() = Some(params.clone());

        self.responses
            .read()
            .get(&op)
            .cloned()
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}
