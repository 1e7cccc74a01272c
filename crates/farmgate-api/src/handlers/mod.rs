//! HTTP request handlers for the gateway API
//!
//! Every handler resolves the control-plane address, issues one operation
//! through the shared resolver and shapes the answer for the dashboard.

pub mod health;
pub mod models;
pub mod sensor;
pub mod status;
pub mod tasks;

use serde::Deserialize;

/// Control-plane address fields; `server_address` is the legacy spelling
#[derive(Debug, Default, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub server_address: Option<String>,
}

impl AddressRequest {
    /// The first non-blank of `address` and `server_address`
    pub fn requested(&self) -> Option<&str> {
        [&self.address, &self.server_address]
            .into_iter()
            .filter_map(|a| a.as_deref())
            .find(|a| !a.trim().is_empty())
    }
}
