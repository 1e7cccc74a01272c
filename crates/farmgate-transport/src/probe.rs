//! Bare TCP reachability probe

use std::time::{Duration, Instant};

use farmgate_core::{GatewayError, GatewayResult};
use tokio::net::TcpStream;
use tracing::debug;

use crate::classify::classify_io;

/// Strip a URL scheme and trailing path, leaving `host:port`
pub fn socket_address(address: &str) -> &str {
    let rest = address
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(address);
    rest.split('/').next().unwrap_or(rest)
}

/// Open and close a TCP connection to `address`, returning the connect latency.
pub async fn tcp_probe(address: &str, deadline: Duration) -> GatewayResult<Duration> {
    let target = socket_address(address.trim());
    if target.is_empty() {
        return Err(GatewayError::InvalidRequest("empty address".into()));
    }

    let started = Instant::now();
    match tokio::time::timeout(deadline, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            let latency = started.elapsed();
            debug!(address = %target, latency_ms = latency.as_millis() as u64, "Probe succeeded");
            Ok(latency)
        }
        Ok(Err(e)) => Err(classify_io(&e, target)),
        Err(_) => Err(GatewayError::timeout(format!("connect {}", target), deadline)),
    }
}
