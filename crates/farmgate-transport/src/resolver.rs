//! Connection resolution across transport strategies

use std::sync::Arc;
use std::time::Duration;

use farmgate_core::{GatewayError, GatewayResult};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::classify::check_payload;
use crate::config::ResolverConfig;
use crate::operation::{Deadlines, Operation};
use crate::strategy::{BridgeStrategy, DegradedStrategy, RpcStrategy, TransportStrategy};

/// Outcome of a resolved call
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Name of the strategy that served the call
    pub strategy: &'static str,
    /// Whether the answer is canned rather than from the control plane
    pub degraded: bool,
    pub body: Value,
}

/// Routes control-plane operations through the first available strategy
pub struct ConnectionResolver {
    strategies: Vec<Arc<dyn TransportStrategy>>,
    deadlines: Deadlines,
}

impl ConnectionResolver {
    /// Create a resolver over an explicit strategy list, highest priority first
    pub fn new(strategies: Vec<Arc<dyn TransportStrategy>>, deadlines: Deadlines) -> Self {
        Self {
            strategies,
            deadlines,
        }
    }

    /// Build the standard strategy chain: RPC, bridge, then (optionally) degraded
    pub fn from_config(config: &ResolverConfig, deadlines: Deadlines) -> GatewayResult<Self> {
        let root = &config.workspace_root;

        let mut strategies: Vec<Arc<dyn TransportStrategy>> = vec![
            Arc::new(RpcStrategy::new(root, &config.definition_candidates)?),
            Arc::new(BridgeStrategy::new(
                root,
                &config.bridge_script_candidates,
                &config.interpreter_candidates,
            )),
        ];
        if config.allow_degraded {
            strategies.push(Arc::new(DegradedStrategy::new()));
        }

        let resolver = Self::new(strategies, deadlines);
        info!(
            workspace_root = %root.display(),
            strategies = ?resolver.strategy_names(),
            "Connection resolver ready"
        );
        Ok(resolver)
    }

    pub fn deadlines(&self) -> &Deadlines {
        &self.deadlines
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Invoke `op` with the deadline configured for its class
    pub async fn call(
        &self,
        address: &str,
        op: Operation,
        params: &Value,
    ) -> GatewayResult<Resolved> {
        let deadline = self.deadlines.for_operation(op);
        self.resolve(address, op, params, deadline).await
    }

    /// Invoke `op` through the first strategy whose prerequisites are present.
    ///
    /// Strategies are only skipped on a failed probe. Once one has been
    /// chosen its result, success or failure, is returned as is.
    #[instrument(skip(self, params))]
    pub async fn resolve(
        &self,
        address: &str,
        op: Operation,
        params: &Value,
        deadline: Duration,
    ) -> GatewayResult<Resolved> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "control plane address is required".into(),
            ));
        }

        let mut skipped = Vec::new();
        for strategy in &self.strategies {
            if let Err(reason) = strategy.probe(op) {
                debug!(strategy = strategy.name(), reason = %reason, "Strategy unavailable");
                skipped.push(format!("{}: {}", strategy.name(), reason));
                continue;
            }

            debug!(strategy = strategy.name(), "Strategy selected");
            let outcome =
                match tokio::time::timeout(deadline, strategy.call(address, op, params, deadline))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(GatewayError::timeout(op.method(), deadline)),
                };

            return match outcome.and_then(|body| check_payload(op, body)) {
                Ok(body) => {
                    let degraded = body.get("degraded").and_then(Value::as_bool) == Some(true);
                    Ok(Resolved {
                        strategy: strategy.name(),
                        degraded,
                        body,
                    })
                }
                Err(e) => {
                    warn!(
                        strategy = strategy.name(),
                        kind = e.kind(),
                        error = %e,
                        "Control-plane call failed"
                    );
                    Err(e)
                }
            };
        }

        Err(GatewayError::ConfigurationError(format!(
            "no transport available for {} ({})",
            op,
            skipped.join("; ")
        )))
    }
}
