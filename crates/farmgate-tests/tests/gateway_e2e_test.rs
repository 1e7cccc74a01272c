//! End-to-end tests: dashboard request -> gateway -> control plane
//!
//! Each test runs a real gateway on an ephemeral port and, where needed, a
//! fake control plane speaking the JSON-over-HTTP RPC routes.

use std::time::Duration;

use farmgate_tests::{
    refused_address, sample_models, silent_listener, start_gateway, FakeControlPlane, Workspace,
    LOAD_BALANCER_DEFINITION,
};
use farmgate_transport::Deadlines;
use pretty_assertions::assert_eq;
use serde_json::json;

const BRIDGE_SCRIPT: &str = r#"
case "$1" in
  health) echo '{"healthy": true, "message": "bridge ok"}' ;;
  get_models) echo '{"models": []}' ;;
  process_sensor_data)
    echo "connecting to control plane"
    echo '{"success": true, "message": "bridged", "client_id": "bridge-node"}'
    ;;
  deploy_model) echo 'StatusCode.UNAVAILABLE: failed to connect to all addresses' >&2; exit 1 ;;
  *) echo "unsupported action $1" >&2; exit 2 ;;
esac
"#;

fn rpc_workspace() -> Workspace {
    Workspace::empty().with_definition(LOAD_BALANCER_DEFINITION)
}

// =============================================================================
// Structured RPC
// =============================================================================

#[tokio::test]
async fn test_gateway_liveness() {
    let workspace = Workspace::empty();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway.get_text("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_health_over_rpc() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post("/api/grpc/health", json!({"address": control.address()}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["transport"], "rpc");
    assert_eq!(body["degraded"], false);
    assert_eq!(body["health"]["healthy"], true);
    assert_eq!(body["health"]["message"], "Load balancer running");
}

#[tokio::test]
async fn test_status_reconciles_node_directory() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post("/api/grpc/status", json!({"server_address": control.address()}))
        .await;
    assert_eq!(status, 200);

    let system = &body["status"];
    assert_eq!(system["total_clients"], 2);
    assert_eq!(system["active_clients"], 1);
    assert_eq!(system["total_models_deployed"], 3);
    assert_eq!(
        system["available_models"],
        json!(["llama3:8b", "dhenu2-llama3.2-3b", "tinyllama"])
    );

    let clients = system["clients"].as_array().unwrap();
    assert_eq!(clients[0]["client_id"], "client-1-jetson");
    assert_eq!(clients[0]["hostname"], "jetson");
    assert_eq!(clients[0]["ip_address"], "192.168.1.21");
    assert_eq!(clients[0]["status"], "offline");
    assert_eq!(
        clients[0]["deployed_models"],
        json!(["llama3:8b", "dhenu2-llama3.2-3b"])
    );
    assert_eq!(clients[1]["client_id"], "client-2-rpi");
    assert_eq!(clients[1]["ip_address"], "192.168.1.34");
    assert_eq!(clients[1]["status"], "online");
}

#[tokio::test]
async fn test_sensor_submission() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/grpc/sensor-data",
            json!({
                "address": control.address(),
                "sensor_data": {
                    "temperature": 40,
                    "humidity": "50",
                    "soil_moisture": 45,
                    "ph_level": 6.5,
                    "nitrogen": "n/a",
                    "location": "North plot"
                }
            }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "Processed 5 readings");
    let analysis = &body["analysis"];
    assert_eq!(analysis["model_used"], "agri-classifier-v1");
    assert_eq!(analysis["client_id"], "client-1-jetson");
    assert_eq!(analysis["processing_time"], 0.4);
    assert_eq!(analysis["detailed_analysis"]["health_score"], 0.8);
    assert_eq!(analysis["detailed_analysis"]["averages"]["nitrogen"], 0.0);

    let alerts = analysis["detailed_analysis"]["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].as_str().unwrap().to_lowercase().contains("temperature"));

    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 6);

    let sent = control.recorded.sensor_requests.read()[0].clone();
    assert_eq!(sent["sensor_id"], "frontend_sensor");
    assert_eq!(sent["sensor_type"], "multi_parameter");
    assert_eq!(sent["location"], "North plot");
    let units: Vec<(String, String)> = sent["readings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["parameter"].as_str().unwrap().to_string(),
                r["unit"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(units.contains(&("temperature".to_string(), "°C".to_string())));
    assert!(units.contains(&("ph_level".to_string(), "pH".to_string())));
    assert!(units.contains(&("nitrogen".to_string(), String::new())));
}

#[tokio::test]
async fn test_task_create_and_poll() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, created) = gateway
        .post(
            "/api/llm/task",
            json!({
                "action": "create_task",
                "address": control.address(),
                "model_name": "llama3:8b",
                "prompt": "Best time to irrigate?"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(created["assigned_client"], "client-2-rpi");
    let task_id = created["task_id"].as_str().unwrap().to_string();

    let (status, polled) = gateway
        .post(
            "/api/llm/task",
            json!({"action": "get_status", "address": control.address(), "task_id": task_id}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(polled["status"], "completed");
    assert_eq!(polled["progress"], 100);
    assert_eq!(polled["result"], "Answer to: Best time to irrigate?");

    assert_eq!(
        control.recorded.ai_requests.read()[0]["request_id"],
        task_id.as_str()
    );

    // Terminal tasks are answered locally
    let (_, again) = gateway
        .post(
            "/api/llm/task",
            json!({"action": "get_status", "address": control.address(), "task_id": task_id}),
        )
        .await;
    assert_eq!(again["status"], "completed");
    assert_eq!(control.recorded.ai_requests.read().len(), 1);
}

#[tokio::test]
async fn test_unknown_task_id() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/llm/task",
            json!({"action": "get_status", "address": control.address(), "task_id": "task_0_000000000000"}),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["hint"], "unknown identifier");
}

#[tokio::test]
async fn test_deploy_model() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/grpc/deploy-model",
            json!({"address": control.address(), "model_name": "llama3:8b"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["container_id"], "farm-llama3-8b");
    assert_eq!(body["assigned_port"], 11500);
    assert_eq!(
        control.recorded.deploy_requests.read()[0]["model_type"],
        "ollama"
    );

    let (status, body) = gateway
        .post(
            "/api/grpc/deploy-model",
            json!({"address": control.address(), "model_name": "unknown-model"}),
        )
        .await;
    assert_eq!(status, 502);
    assert_eq!(body["kind"], "protocol_error");
    assert!(body["error"].as_str().unwrap().contains("Model not available"));
}

#[tokio::test]
async fn test_direct_ai_request() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/grpc/ai-request",
            json!({"address": control.address(), "model_name": "llama3:8b", "prompt": "Hello"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["response_text"], "Answer to: Hello");
    assert_eq!(body["model_used"], "llama3:8b");
    assert!(body["request_id"].as_str().unwrap().starts_with("req_"));
}

#[tokio::test]
async fn test_undeclared_method_is_configuration_error() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = Workspace::empty().with_definition(
        "package loadbalancer;\nservice LoadBalancer {\n  rpc HealthCheck(A) returns (B);\n}\n",
    );
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/grpc/deploy-model",
            json!({"address": control.address(), "model_name": "llama3:8b"}),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["kind"], "configuration_error");
    assert!(control.recorded.deploy_requests.read().is_empty());
}

// =============================================================================
// Error classification
// =============================================================================

#[tokio::test]
async fn test_silent_server_is_timeout() {
    let (addr, _hold) = silent_listener().await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(
        &workspace.resolver_config(),
        Deadlines::uniform(Duration::from_millis(300)),
    )
    .await;

    let (status, body) = gateway
        .post("/api/grpc/health", json!({"address": addr.to_string()}))
        .await;
    assert_eq!(status, 504);
    assert_eq!(body["kind"], "timeout");
    assert_eq!(body["hint"], "server overloaded or slow; retry later");
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() {
    let addr = refused_address().await;
    let workspace = rpc_workspace();
    let gateway = start_gateway(
        &workspace.resolver_config(),
        Deadlines::uniform(Duration::from_secs(5)),
    )
    .await;

    let (status, body) = gateway
        .post("/api/grpc/status", json!({"address": addr.to_string()}))
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["kind"], "unavailable");
    assert_eq!(body["status"]["total_clients"], 0);
    assert_eq!(body["models"], json!([]));
}

// =============================================================================
// Degraded and bridge transports
// =============================================================================

#[tokio::test]
async fn test_degraded_reads_without_artifacts() {
    let workspace = Workspace::empty();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post("/api/grpc/health", json!({"address": "192.168.1.50:50051"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["transport"], "degraded");
    assert_eq!(body["health"]["healthy"], false);

    let (status, body) = gateway
        .post("/api/grpc/status", json!({"address": "192.168.1.50:50051"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["status"]["total_clients"], 0);
}

#[tokio::test]
async fn test_degraded_refuses_writes() {
    let workspace = Workspace::empty();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/grpc/sensor-data",
            json!({"address": "192.168.1.50:50051", "sensor_data": {"temperature": 22}}),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["kind"], "configuration_error");
    assert_eq!(body["analysis"]["summary"], "Failed to process sensor data");
    assert_eq!(body["analysis"]["detailed_analysis"]["health_score"], 0.0);
    assert_eq!(
        body["recommendations"],
        json!(["Check connection to load balancer", "Verify sensor data format"])
    );
}

#[tokio::test]
async fn test_task_create_without_registry_uses_fallback_client() {
    let workspace = Workspace::empty();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post(
            "/api/llm/task",
            json!({"action": "create_task", "address": "192.168.1.50:50051",
                   "model_name": "dhenu2-llama3.2-3b", "prompt": "hi"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["assigned_client"], "client_for_dhenu2-llama3.2-3b");
}

#[cfg(unix)]
#[tokio::test]
async fn test_bridge_transport() {
    let workspace = Workspace::empty().with_bridge_script(BRIDGE_SCRIPT);
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post("/api/grpc/health", json!({"address": "192.168.1.50:50051"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["transport"], "bridge");
    assert_eq!(body["health"]["message"], "bridge ok");

    let (status, body) = gateway
        .post(
            "/api/grpc/sensor-data",
            json!({"address": "192.168.1.50:50051", "sensor_data": {"temperature": 25}}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "bridged");
    assert_eq!(body["analysis"]["client_id"], "bridge-node");

    let (status, body) = gateway
        .post(
            "/api/grpc/deploy-model",
            json!({"address": "192.168.1.50:50051", "model_name": "llama3:8b"}),
        )
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["kind"], "unavailable");
}

#[tokio::test]
async fn test_rpc_takes_priority_over_bridge() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace().with_bridge_script(BRIDGE_SCRIPT);
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (_, body) = gateway
        .post("/api/grpc/health", json!({"address": control.address()}))
        .await;
    assert_eq!(body["transport"], "rpc");
}

// =============================================================================
// Liveness probe and addressing
// =============================================================================

#[tokio::test]
async fn test_simple_health() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = Workspace::empty();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway
        .post("/api/simple-health", json!({"address": control.address()}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["reachable"], true);
    assert!(body["latency_ms"].as_u64().is_some());

    let refused = refused_address().await;
    let (status, body) = gateway
        .post("/api/simple-health", json!({"address": refused.to_string()}))
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["reachable"], false);
}

#[tokio::test]
async fn test_default_address_from_config() {
    let control = FakeControlPlane::start(sample_models()).await;
    let workspace = rpc_workspace();
    let mut config = workspace.resolver_config();
    config.default_address = Some(control.address());
    let gateway = start_gateway(&config, Deadlines::default()).await;

    let (status, body) = gateway.post("/api/grpc/health", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["health"]["healthy"], true);
}

#[tokio::test]
async fn test_missing_address_without_default() {
    let workspace = rpc_workspace();
    let gateway = start_gateway(&workspace.resolver_config(), Deadlines::default()).await;

    let (status, body) = gateway.post("/api/grpc/health", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "invalid_request");
}
