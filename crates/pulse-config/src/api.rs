//! Upstream compliance API configuration.

use serde::{Deserialize, Serialize};

/// Default per-request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the compliance API (e.g., `https://grc.example.com/api/v1`).
    #[serde(default)]
    pub base_url: String,

    /// Bearer token attached to every request. Token issuance and refresh
    /// belong to the transport layer; this is only a static fallback.
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Check if the API section has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// Bearer token, if one is set.
    pub fn bearer_token(&self) -> Option<&str> {
        (!self.token.is_empty()).then_some(self.token.as_str())
    }
}
