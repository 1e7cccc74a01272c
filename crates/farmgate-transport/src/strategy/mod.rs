//! Transport strategies
//!
//! Each strategy is one way of reaching the control plane. The resolver asks
//! [`TransportStrategy::probe`] whether a strategy can serve an operation
//! before handing it the call.

mod bridge;
mod degraded;
mod mock;
mod rpc;

use std::time::Duration;

use async_trait::async_trait;
use farmgate_core::GatewayResult;
use serde_json::Value;

use crate::operation::Operation;

pub use bridge::BridgeStrategy;
pub use degraded::{DegradedStrategy, DEGRADED_MESSAGE};
pub use mock::MockStrategy;
pub use rpc::RpcStrategy;

/// One way of invoking control-plane operations
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    /// Short name reported next to responses (`rpc`, `bridge`, `degraded`)
    fn name(&self) -> &'static str;

    /// Check that the prerequisites for `op` are present.
    ///
    /// Must not touch the network: an `Err` here only means "skip this
    /// strategy", never that the control plane is down.
    fn probe(&self, op: Operation) -> GatewayResult<()>;

    /// Invoke `op` on the control plane at `address`
    ///
    /// # Arguments
    /// * `address` - `host:port` of the control plane, optionally with a scheme
    /// * `params` - JSON request parameters
    /// * `deadline` - Maximum time the call may take
    async fn call(
        &self,
        address: &str,
        op: Operation,
        params: &Value,
        deadline: Duration,
    ) -> GatewayResult<Value>;
}
