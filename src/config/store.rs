use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storefront behaviour that is not owned by the database.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// `payment_method.id` of cash on delivery. Orders paid this way start as `pending`,
    /// everything else waits for `payment`.
    /// TOML: `store.cash_on_delivery_method_id`.
    #[serde(default = "default_cod_method_id")]
    pub cash_on_delivery_method_id: String,

    /// Server-initiated WebSocket ping interval in seconds.
    /// TOML: `store.ws_ping_secs`. Default: `30`.
    #[serde(default = "default_ws_ping_secs")]
    pub ws_ping_secs: u64,
}

impl StoreConfig {
    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_secs(self.ws_ping_secs.max(1))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cash_on_delivery_method_id: default_cod_method_id(),
            ws_ping_secs: default_ws_ping_secs(),
        }
    }
}

fn default_cod_method_id() -> String {
    "ecd09068-bebe-48ff-b834-9e4932619fa0".to_string()
}

fn default_ws_ping_secs() -> u64 {
    30
}
