use crate::domain::address::AddressPolicy;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings shared by the principals and the orchestrator.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub merchant_id: String,
    pub merchant_name: String,
    /// How long a signed cart stays valid for authorization.
    pub cart_ttl_secs: u64,
    /// Upper bound on every principal call made by the orchestrator.
    pub call_timeout_ms: u64,
    /// Maximum number of settlements kept for replay.
    pub cache_capacity: usize,
    pub cache_max_age_secs: u64,
    pub address_policy: AddressPolicy,
    pub protocol_tag: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merchant_id: "merchant-demo".to_string(),
            merchant_name: "Demo Merchant".to_string(),
            cart_ttl_secs: 60 * 60,
            call_timeout_ms: 30_000,
            cache_capacity: 1024,
            cache_max_age_secs: 24 * 60 * 60,
            address_policy: AddressPolicy::Any,
            protocol_tag: "x402".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn cart_ttl(&self) -> Result<chrono::Duration> {
        ttl_from_secs(self.cart_ttl_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }
}

pub(crate) fn ttl_from_secs(secs: u64) -> Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| {
            ProtocolError::Validation(format!("Cart TTL of {} seconds is out of range", secs))
        })
}
