//! Integration test helpers for the farm gateway
//!
//! - [`TestServer`]: an axum router served on an ephemeral port
//! - [`FakeControlPlane`]: a control plane answering the JSON-over-HTTP RPC routes
//! - [`Workspace`]: a temp directory holding the artifacts transports look for

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use farmgate_api::{create_router, AppState};
use farmgate_core::{AnalysisConfig, SensorAnalysisEngine};
use farmgate_transport::{ConnectionResolver, Deadlines, ResolverConfig};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Interface definition declaring every control-plane operation
pub const LOAD_BALANCER_DEFINITION: &str = r#"syntax = "proto3";

package loadbalancer;

service LoadBalancer {
  rpc HealthCheck(HealthRequest) returns (HealthResponse);
  rpc GetAvailableModels(Empty) returns (ModelList);
  rpc ProcessSensorData(SensorDataRequest) returns (SensorDataResponse);
  rpc DeployModel(DeployModelRequest) returns (DeployModelResponse);
  rpc ProcessAIRequest(AIRequest) returns (AIResponse);
}
"#;

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on `127.0.0.1:0`
    pub async fn start(router: Router) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(std::io::Error::other)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `host:port` for use as a control-plane address
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// POST a JSON body, returning the status code and JSON response
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(&body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e));
        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .unwrap_or_else(|e| panic!("POST {} returned non-JSON: {}", path, e));
        (status, body)
    }

    pub async fn get_text(&self, path: &str) -> (u16, String) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("GET {} failed: {}", path, e));
        let status = response.status().as_u16();
        (status, response.text().await.unwrap_or_default())
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Requests received by the fake control plane
#[derive(Default)]
pub struct Recorded {
    pub models: RwLock<Vec<Value>>,
    pub sensor_requests: RwLock<Vec<Value>>,
    pub ai_requests: RwLock<Vec<Value>>,
    pub deploy_requests: RwLock<Vec<Value>>,
}

/// Control plane answering `POST /loadbalancer.LoadBalancer/<Method>`
pub struct FakeControlPlane {
    pub server: TestServer,
    pub recorded: Arc<Recorded>,
}

impl FakeControlPlane {
    /// Start with the given model list
    pub async fn start(models: Value) -> Self {
        let recorded = Arc::new(Recorded::default());
        if let Value::Array(models) = models {
            *recorded.models.write() = models;
        }

        let router = Router::new()
            .route("/loadbalancer.LoadBalancer/HealthCheck", post(health_check))
            .route(
                "/loadbalancer.LoadBalancer/GetAvailableModels",
                post(get_available_models),
            )
            .route(
                "/loadbalancer.LoadBalancer/ProcessSensorData",
                post(process_sensor_data),
            )
            .route("/loadbalancer.LoadBalancer/DeployModel", post(deploy_model))
            .route(
                "/loadbalancer.LoadBalancer/ProcessAIRequest",
                post(process_ai_request),
            )
            .with_state(recorded.clone());

        let server = TestServer::start(router)
            .await
            .unwrap_or_else(|e| panic!("fake control plane failed to start: {}", e));
        Self { server, recorded }
    }

    pub fn address(&self) -> String {
        self.server.address()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "healthy": true,
        "message": "Load balancer running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn get_available_models(State(recorded): State<Arc<Recorded>>) -> Json<Value> {
    let models = recorded.models.read().clone();
    Json(json!({ "models": models }))
}

async fn process_sensor_data(
    State(recorded): State<Arc<Recorded>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let count = body["readings"].as_array().map(Vec::len).unwrap_or(0);
    recorded.sensor_requests.write().push(body);
    Json(json!({
        "success": true,
        "message": format!("Processed {} readings", count),
        "processing_time": 0.4,
        "model_used": "agri-classifier-v1",
        "client_id": "client-1-jetson",
    }))
}

async fn deploy_model(
    State(recorded): State<Arc<Recorded>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let model = body["model_name"].as_str().unwrap_or_default().to_string();
    recorded.deploy_requests.write().push(body);
    if model == "unknown-model" {
        return Json(json!({"success": false, "message": "Model not available"}));
    }
    Json(json!({
        "success": true,
        "message": format!("Deployed {}", model),
        "container_id": format!("farm-{}", model.replace(':', "-")),
        "endpoint_url": "http://10.0.0.7:11500",
        "assigned_port": 11500,
    }))
}

async fn process_ai_request(
    State(recorded): State<Arc<Recorded>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let reply = json!({
        "success": true,
        "request_id": body["request_id"],
        "response_text": format!("Answer to: {}", body["prompt"].as_str().unwrap_or_default()),
        "processing_time": 1.2,
        "model_used": body["model_name"],
        "client_id": "client-2-rpi",
    });
    recorded.ai_requests.write().push(body);
    Json(reply)
}

/// A listener that accepts connections and never answers
pub async fn silent_listener() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("bind failed: {}", e));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("local_addr failed: {}", e));

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr, handle)
}

/// An address on which nothing listens
pub async fn refused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("bind failed: {}", e));
    listener
        .local_addr()
        .unwrap_or_else(|e| panic!("local_addr failed: {}", e))
}

/// Temp directory laid out like a gateway deployment
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub const DEFINITION: &'static str = "load_balancer.proto";
    pub const BRIDGE_SCRIPT: &'static str = "scripts/grpc_bridge.sh";

    /// No artifacts at all
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {}", e)),
        }
    }

    pub fn with_definition(self, definition: &str) -> Self {
        self.write(Self::DEFINITION, definition);
        self
    }

    pub fn with_bridge_script(self, script: &str) -> Self {
        self.write(Self::BRIDGE_SCRIPT, script);
        self
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("mkdir {} failed: {}", parent.display(), e));
        }
        std::fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write {} failed: {}", path.display(), e));
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Resolver config confined to this workspace; the bridge runs under `sh`
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            default_address: None,
            workspace_root: self.root().to_path_buf(),
            definition_candidates: vec![PathBuf::from(Self::DEFINITION)],
            bridge_script_candidates: vec![PathBuf::from(Self::BRIDGE_SCRIPT)],
            interpreter_candidates: vec![PathBuf::from("sh")],
            allow_degraded: true,
        }
    }
}

/// Start a gateway over `config`
pub async fn start_gateway(config: &ResolverConfig, deadlines: Deadlines) -> TestServer {
    let resolver = ConnectionResolver::from_config(config, deadlines)
        .unwrap_or_else(|e| panic!("resolver setup failed: {}", e));
    let state = AppState::new(resolver, SensorAnalysisEngine::new(AnalysisConfig::default()))
        .with_default_address(config.default_address.clone());

    TestServer::start(create_router(state))
        .await
        .unwrap_or_else(|e| panic!("gateway failed to start: {}", e))
}

/// Model list with two nodes; only the second runs `llama3:8b`
pub fn sample_models() -> Value {
    json!([
        {"model_name": "llama3:8b", "model_type": "ollama", "status": "stopped",
         "endpoint_url": "http://192.168.1.21:11434", "client_id": "client-1-jetson",
         "performance_score": 0.72},
        {"model_name": "dhenu2-llama3.2-3b", "model_type": "ollama", "status": "running",
         "endpoint_url": "http://192.168.1.21:11435", "client_id": "client-1-jetson",
         "performance_score": 0.72},
        {"model_name": "llama3:8b", "model_type": "ollama", "status": "running",
         "endpoint_url": "192.168.1.34:11434", "client_id": "client-2-rpi",
         "performance_score": 0.91},
        {"model_name": "tinyllama", "model_type": "ollama", "status": "not_deployed",
         "endpoint_url": "", "client_id": "", "performance_score": 0.0}
    ])
}
