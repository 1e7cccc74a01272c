//! farmgate-api - HTTP surface of the farm gateway
//!
//! Every route answers with a tagged body: `success: true` plus the
//! operation's payload, or `success: false` with `error`, `kind` and `hint`
//! (see [`ApiError`]).
//!
//! # Usage
//!
//! ```ignore
//! use farmgate_api::{create_router, AppState};
//!
//! let resolver = ConnectionResolver::from_config(&config, Deadlines::default())?;
//! let state = AppState::new(resolver, SensorAnalysisEngine::default());
//! let router = create_router(state);
//! ```

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Gateway self-liveness
        .route("/health", get(|| async { "OK" }))
        // Control-plane operations
        .route("/api/grpc/health", post(handlers::health::health))
        .route("/api/grpc/status", post(handlers::status::status))
        .route(
            "/api/grpc/sensor-data",
            post(handlers::sensor::submit_sensor_data),
        )
        .route(
            "/api/grpc/deploy-model",
            post(handlers::models::deploy_model),
        )
        .route("/api/grpc/ai-request", post(handlers::models::ai_request))
        // Tasks
        .route("/api/llm/task", post(handlers::tasks::task))
        // TCP reachability
        .route("/api/simple-health", post(handlers::health::simple_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use farmgate_core::{GatewayError, SensorAnalysisEngine};
    use farmgate_transport::strategy::MockStrategy;
    use farmgate_transport::{ConnectionResolver, Deadlines, Operation, TransportStrategy};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const ADDRESS: &str = "10.0.0.5:50051";

    fn router_with(mock: Arc<MockStrategy>) -> (Router, AppState) {
        let strategies: Vec<Arc<dyn TransportStrategy>> = vec![mock];
        let state = AppState::new(
            ConnectionResolver::new(strategies, Deadlines::default()),
            SensorAnalysisEngine::default(),
        );
        (create_router(state.clone()), state)
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// POST a raw body with an optional content type
    async fn post_raw(
        router: &Router,
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn models_body() -> Value {
        json!({"models": [
            {"model_name": "llama3:8b", "model_type": "ollama", "status": "stopped",
             "endpoint_url": "http://10.0.0.7:11434", "client_id": "client-1-jetson",
             "performance_score": 0.7},
            {"model_name": "llama3:8b", "model_type": "ollama", "status": "running",
             "endpoint_url": "http://10.0.0.8:11434", "client_id": "client-2-rpi",
             "performance_score": 0.9},
            {"model_name": "dhenu2-llama3.2-3b", "model_type": "ollama", "status": "running",
             "endpoint_url": "http://10.0.0.7:11435", "client_id": "client-1-jetson",
             "performance_score": 0.7},
            {"model_name": "tinyllama", "model_type": "ollama", "status": "not_deployed",
             "endpoint_url": "", "client_id": "", "performance_score": 0.0}
        ]})
    }

    #[tokio::test]
    async fn test_health() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock);

        let (status, body) = post_json(&router, "/api/grpc/health", json!({"address": ADDRESS})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["health"]["healthy"], true);
        assert_eq!(body["transport"], "mock");
    }

    #[tokio::test]
    async fn test_legacy_address_field() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        let (status, _) =
            post_json(&router, "/api/grpc/health", json!({"server_address": ADDRESS})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_address_is_bad_request() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        let (status, body) = post_json(&router, "/api/grpc/health", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_both_address_fields_are_accepted() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        let (status, body) = post_json(
            &router,
            "/api/grpc/health",
            json!({"address": ADDRESS, "server_address": "10.0.0.6:50051"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_tagged() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        let (status, body) = post_raw(
            &router,
            "/api/grpc/health",
            Some("application/json"),
            "{address: nope",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "invalid_request");
        assert!(body["hint"].is_string());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_tagged() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        let body_text = r#"{"address": "10.0.0.5:50051"}"#;
        for uri in ["/api/grpc/health", "/api/llm/task", "/api/grpc/deploy-model"] {
            let (status, body) = post_raw(&router, uri, None, body_text).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["success"], false, "{}", uri);
            assert_eq!(body["kind"], "invalid_request", "{}", uri);
        }
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_status_malformed_body_carries_empty_status() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock);

        let (status, body) =
            post_raw(&router, "/api/grpc/status", Some("application/json"), "[1,").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"]["total_clients"], 0);
        assert_eq!(body["models"], json!([]));
    }

    #[tokio::test]
    async fn test_status_reconciles_nodes() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(Operation::GetAvailableModels, Ok(models_body()));
        let (router, _) = router_with(mock);

        let (status, body) = post_json(&router, "/api/grpc/status", json!({"address": ADDRESS})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["total_clients"], 2);
        assert_eq!(body["status"]["active_clients"], 1);
        assert_eq!(body["status"]["total_models_deployed"], 3);
        assert_eq!(body["status"]["clients"][0]["client_id"], "client-1-jetson");
        assert_eq!(body["status"]["clients"][0]["hostname"], "jetson");
        assert_eq!(body["status"]["clients"][0]["ip_address"], "10.0.0.7");
        assert_eq!(
            body["status"]["clients"][0]["deployed_models"],
            json!(["llama3:8b", "dhenu2-llama3.2-3b"])
        );
        assert_eq!(body["models"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_status_failure_carries_empty_status() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::GetAvailableModels,
            Err(GatewayError::Unavailable("connection refused".into())),
        );
        let (router, _) = router_with(mock);

        let (status, body) = post_json(&router, "/api/grpc/status", json!({"address": ADDRESS})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["hint"], "server not running or unreachable");
        assert_eq!(body["status"]["total_clients"], 0);
        assert_eq!(body["models"], json!([]));
    }

    #[tokio::test]
    async fn test_sensor_analysis() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::ProcessSensorData,
            Ok(json!({"success": true, "message": "stored", "model_used": "agri-v2"})),
        );
        let (router, _) = router_with(mock.clone());

        let (status, body) = post_json(
            &router,
            "/api/grpc/sensor-data",
            json!({
                "address": ADDRESS,
                "sensor_data": {
                    "temperature": "40",
                    "humidity": 50,
                    "soil_moisture": 45,
                    "ph_level": 6.5,
                    "sensor_id": "field-7"
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "stored");
        assert_eq!(body["analysis"]["detailed_analysis"]["health_score"], 0.8);
        assert_eq!(body["analysis"]["model_used"], "agri-v2");
        assert_eq!(body["analysis"]["client_id"], "sensor-processor");
        assert_eq!(
            body["analysis"]["summary"],
            "Analysis of agricultural sensor data shows good growing conditions."
        );
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 6);

        let sent = mock.last_params().unwrap();
        assert_eq!(sent["sensor_id"], "field-7");
        assert_eq!(sent["sensor_type"], "multi_parameter");
    }

    #[tokio::test]
    async fn test_sensor_request_errors_carry_fallback() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock.clone());

        // No address, no reading
        let (status, body) = post_json(&router, "/api/grpc/sensor-data", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);
        assert_eq!(body["analysis"]["summary"], "Failed to process sensor data");
        assert_eq!(body["analysis"]["detailed_analysis"]["health_score"], 0.0);

        // Address but no reading
        let (status, body) =
            post_json(&router, "/api/grpc/sensor-data", json!({"address": ADDRESS})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("sensor_data"));
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);

        // Unparsable body
        let (status, body) = post_raw(
            &router,
            "/api/grpc/sensor-data",
            Some("application/json"),
            "{\"sensor_data\": ",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);

        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_sensor_failure_fallback() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::ProcessSensorData,
            Err(GatewayError::ProtocolError("bad reading".into())),
        );
        let (router, _) = router_with(mock);

        let (status, body) = post_json(
            &router,
            "/api/grpc/sensor-data",
            json!({"address": ADDRESS, "sensor_data": {"temperature": 20}}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "protocol_error");
        assert_eq!(body["analysis"]["detailed_analysis"]["health_score"], 0.0);
        assert_eq!(
            body["recommendations"],
            json!(["Check connection to load balancer", "Verify sensor data format"])
        );
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(Operation::GetAvailableModels, Ok(models_body()));
        mock.respond(
            Operation::ProcessAiRequest,
            Ok(json!({"success": true, "response_text": "Sow in November."})),
        );
        let (router, state) = router_with(mock.clone());

        let (status, created) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "create_task", "address": ADDRESS,
                   "model_name": "llama3:8b", "prompt": "When to sow wheat?"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // The online node wins over the first-listed one
        assert_eq!(created["assigned_client"], "client-2-rpi");
        let task_id = created["task_id"].as_str().unwrap().to_string();
        assert!(task_id.starts_with("task_"));
        assert_eq!(state.tracker.len(), 1);

        let (_, polled) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "get_status", "address": ADDRESS, "task_id": task_id}),
        )
        .await;
        assert_eq!(polled["status"], "completed");
        assert_eq!(polled["progress"], 100);
        assert_eq!(polled["result"], "Sow in November.");
        assert_eq!(polled["client_id"], "client-2-rpi");
        assert_eq!(mock.last_params().unwrap()["request_id"], task_id.as_str());
    }

    #[tokio::test]
    async fn test_task_create_falls_back_to_naming_convention() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::GetAvailableModels,
            Err(GatewayError::timeout("GetAvailableModels", std::time::Duration::from_secs(15))),
        );
        let (router, _) = router_with(mock);

        let (status, created) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "create_task", "address": ADDRESS,
                   "model_name": "llama3:8b", "prompt": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["assigned_client"], "client_for_llama3:8b");
    }

    #[tokio::test]
    async fn test_task_status_transient_error_keeps_task_submitted() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::ProcessAiRequest,
            Err(GatewayError::timeout("ProcessAIRequest", std::time::Duration::from_secs(120))),
        );
        let (router, state) = router_with(mock);
        let task = state.tracker.create("llama3:8b", "hi", None);

        let (status, body) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "get_status", "address": ADDRESS, "task_id": task.task_id}),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["kind"], "timeout");
        assert_eq!(
            state.tracker.status(&task.task_id).unwrap().status,
            farmgate_core::TaskStatus::Submitted
        );
    }

    #[tokio::test]
    async fn test_task_status_rejection_fails_task() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::ProcessAiRequest,
            Ok(json!({"success": false, "error": "model not loaded"})),
        );
        let (router, state) = router_with(mock);
        let task = state.tracker.create("llama3:8b", "hi", None);

        let (status, body) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "get_status", "address": ADDRESS, "task_id": task.task_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");
        assert!(body["result"].as_str().unwrap().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock);

        let (status, body) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "get_status", "address": ADDRESS, "task_id": "task_1_abc"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let mock = Arc::new(MockStrategy::new());
        let (router, _) = router_with(mock);

        let (status, body) =
            post_json(&router, "/api/llm/task", json!({"action": "cancel_task"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cancel_task"));
    }

    #[tokio::test]
    async fn test_assignments() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(Operation::GetAvailableModels, Ok(models_body()));
        let (router, _) = router_with(mock);

        let (status, body) = post_json(
            &router,
            "/api/llm/task",
            json!({"action": "get_assignments", "address": ADDRESS}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assignments"]["client-2-rpi"], "llama3:8b");
        assert_eq!(body["model_info"]["llama3:8b"]["size"], "8B");
        assert_eq!(body["model_info"]["dhenu2-llama3.2-3b"]["size"], "3B");
        assert!(body["model_info"].get("tinyllama").is_none());
    }

    #[tokio::test]
    async fn test_deploy_model_defaults_type() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::DeployModel,
            Ok(json!({"message": "deployed", "container_id": "c1",
                      "endpoint_url": "http://10.0.0.7:11500", "assigned_port": 11500})),
        );
        let (router, _) = router_with(mock.clone());

        let (status, body) = post_json(
            &router,
            "/api/grpc/deploy-model",
            json!({"address": ADDRESS, "model_name": "llama3:8b"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["assigned_port"], 11500);
        assert_eq!(mock.last_params().unwrap()["model_type"], "ollama");
    }

    #[tokio::test]
    async fn test_ai_request_generates_request_id() {
        let mock = Arc::new(MockStrategy::new());
        mock.respond(
            Operation::ProcessAiRequest,
            Ok(json!({"response_text": "42", "model_used": "llama3:8b"})),
        );
        let (router, _) = router_with(mock);

        let (status, body) = post_json(
            &router,
            "/api/grpc/ai-request",
            json!({"address": ADDRESS, "model_name": "llama3:8b", "prompt": "?"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response_text"], "42");
        assert!(body["request_id"].as_str().unwrap().starts_with("req_"));
    }
}
