//! JSON-over-HTTP RPC strategy

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use farmgate_core::{GatewayError, GatewayResult};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::TransportStrategy;
use crate::classify::{classify_http, classify_status};
use crate::definition::InterfaceDefinition;
use crate::discovery::find_artifact;
use crate::operation::Operation;

/// Calls `POST http://<address>/<package>.<Service>/<Method>` with a JSON body.
///
/// Available only when the interface definition exists on one of the
/// candidate paths, and only for methods it declares.
pub struct RpcStrategy {
    client: Client,
    definition: Option<InterfaceDefinition>,
    unavailable_reason: Option<String>,
}

impl RpcStrategy {
    /// Locate and parse the interface definition.
    ///
    /// A missing or unreadable definition does not fail construction; the
    /// strategy then reports itself unavailable from [`TransportStrategy::probe`].
    pub fn new(root: &Path, candidates: &[PathBuf]) -> GatewayResult<Self> {
        let loaded = find_artifact(root, candidates, "interface definition")
            .and_then(|path| InterfaceDefinition::load(&path));
        let client = build_client()?;

        Ok(match loaded {
            Ok(definition) => {
                debug!(
                    service = %definition.qualified_service(),
                    methods = definition.methods.len(),
                    "Loaded interface definition"
                );
                Self {
                    client,
                    definition: Some(definition),
                    unavailable_reason: None,
                }
            }
            Err(e) => Self {
                client,
                definition: None,
                unavailable_reason: Some(e.to_string()),
            },
        })
    }

    /// Use an already-parsed definition
    pub fn with_definition(definition: InterfaceDefinition) -> GatewayResult<Self> {
        Ok(Self {
            client: build_client()?,
            definition: Some(definition),
            unavailable_reason: None,
        })
    }

    pub fn definition(&self) -> Option<&InterfaceDefinition> {
        self.definition.as_ref()
    }

    fn url(&self, address: &str, definition: &InterfaceDefinition, op: Operation) -> String {
        let base = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };
        format!("{}{}", base, definition.route(op.method()))
    }
}

fn build_client() -> GatewayResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl TransportStrategy for RpcStrategy {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn probe(&self, op: Operation) -> GatewayResult<()> {
        let definition = self.definition.as_ref().ok_or_else(|| {
            GatewayError::ConfigurationError(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "interface definition not loaded".into()),
            )
        })?;

        if !definition.declares(op.method()) {
            return Err(GatewayError::ConfigurationError(format!(
                "{} does not declare {}",
                definition.qualified_service(),
                op.method()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, params), fields(strategy = "rpc"))]
    async fn call(
        &self,
        address: &str,
        op: Operation,
        params: &Value,
        deadline: Duration,
    ) -> GatewayResult<Value> {
        self.probe(op)?;
        let Some(definition) = self.definition.as_ref() else {
            return Err(GatewayError::ConfigurationError(
                "interface definition not loaded".into(),
            ));
        };

        let url = self.url(address, definition, op);
        debug!(url = %url, "RPC call");

        let response = self
            .client
            .post(&url)
            .timeout(deadline)
            .json(params)
            .send()
            .await
            .map_err(|e| classify_http(e, op, deadline))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, op, deadline, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| classify_http(e, op, deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = "package loadbalancer;\nservice LoadBalancer {\n  rpc HealthCheck(A) returns (B);\n}\n";

    #[test]
    fn test_missing_definition_fails_probe() {
        let dir = tempfile::tempdir().unwrap();
        let rpc = RpcStrategy::new(dir.path(), &[PathBuf::from("load_balancer.proto")]).unwrap();

        let err = rpc.probe(Operation::HealthCheck).unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(err.to_string().contains("load_balancer.proto"));
    }

    #[test]
    fn test_undeclared_method_fails_probe() {
        let def = InterfaceDefinition::parse(DEFINITION).unwrap();
        let rpc = RpcStrategy::with_definition(def).unwrap();

        assert!(rpc.probe(Operation::HealthCheck).is_ok());
        let err = rpc.probe(Operation::DeployModel).unwrap_err();
        assert!(err.to_string().contains("DeployModel"));
    }

    #[test]
    fn test_url() {
        let def = InterfaceDefinition::parse(DEFINITION).unwrap();
        let rpc = RpcStrategy::with_definition(def.clone()).unwrap();

        assert_eq!(
            rpc.url("10.0.0.5:50051", &def, Operation::HealthCheck),
            "http://10.0.0.5:50051/loadbalancer.LoadBalancer/HealthCheck"
        );
        assert_eq!(
            rpc.url("https://lb.farm/", &def, Operation::HealthCheck),
            "https://lb.farm/loadbalancer.LoadBalancer/HealthCheck"
        );
    }

    #[tokio::test]
    async fn test_undeclared_method_makes_no_call() {
        let def = InterfaceDefinition::parse(DEFINITION).unwrap();
        let rpc = RpcStrategy::with_definition(def).unwrap();

        // Nothing listens on port 9; the call must fail before connecting.
        let err = rpc
            .call(
                "127.0.0.1:9",
                Operation::ProcessSensorData,
                &serde_json::json!({}),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }
}
