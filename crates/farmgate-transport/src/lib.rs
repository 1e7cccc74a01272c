//! farmgate-transport - Reaching the control plane
//!
//! The control plane can be reached in more than one way, and which one works
//! depends on what is installed next to the gateway. [`ConnectionResolver`]
//! holds an ordered list of [`TransportStrategy`] objects and uses the first
//! one whose prerequisites are present:
//!
//! 1. [`RpcStrategy`]: JSON-over-HTTP RPC, described by an interface
//!    definition file (`load_balancer.proto`) found on disk
//! 2. [`BridgeStrategy`]: a local bridge script run by an interpreter, taking
//!    the operation and its JSON parameters on argv
//! 3. [`DegradedStrategy`]: canned answers, read-only operations only
//!
//! Once a strategy starts a call its outcome is final: a refused connection
//! or an expired deadline is reported, never retried on the next strategy.
//!
//! # Example
//!
//! ```rust,ignore
//! use farmgate_transport::{ConnectionResolver, Deadlines, Operation, ResolverConfig};
//!
//! let resolver = ConnectionResolver::from_config(&ResolverConfig::default(), Deadlines::default())?;
//! let resolved = resolver
//!     .call("192.168.1.50:50051", Operation::HealthCheck, &serde_json::json!({}))
//!     .await?;
//! println!("{} answered via {}", resolved.body, resolved.strategy);
//! ```

pub mod classify;
pub mod config;
pub mod definition;
pub mod discovery;
pub mod operation;
pub mod probe;
mod resolver;
pub mod strategy;
pub mod wire;

pub use config::ResolverConfig;
pub use definition::InterfaceDefinition;
pub use operation::{DeadlineClass, Deadlines, Operation};
pub use resolver::{ConnectionResolver, Resolved};
pub use strategy::{BridgeStrategy, DegradedStrategy, RpcStrategy, TransportStrategy};

// Re-export core error types for convenience
pub use farmgate_core::{GatewayError, GatewayResult};
