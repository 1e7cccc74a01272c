//! Degraded strategy: canned answers for read-only operations

use std::time::Duration;

use async_trait::async_trait;
use farmgate_core::{GatewayError, GatewayResult};
use serde_json::{json, Value};

use super::TransportStrategy;
use crate::operation::Operation;

/// Message carried by a degraded health answer
pub const DEGRADED_MESSAGE: &str = "control plane unreachable; degraded response";

/// Last resort when neither RPC nor bridge is configured.
///
/// Never reports a healthy control plane and never accepts writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DegradedStrategy;

impl DegradedStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportStrategy for DegradedStrategy {
    fn name(&self) -> &'static str {
        "degraded"
    }

    fn probe(&self, op: Operation) -> GatewayResult<()> {
        if op.is_read_only() {
            Ok(())
        } else {
            Err(GatewayError::ConfigurationError(format!(
                "{} needs a live transport",
                op
            )))
        }
    }

    async fn call(
        &self,
        _address: &str,
        op: Operation,
        _params: &Value,
        _deadline: Duration,
    ) -> GatewayResult<Value> {
        self.probe(op)?;
        Ok(match op {
            Operation::HealthCheck => json!({
                "healthy": false,
                "message": DEGRADED_MESSAGE,
                "degraded": true,
            }),
            _ => json!({
                "models": [],
                "degraded": true,
            }),
        })
    }
}
