//! Snapshot cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default snapshot time-to-live: five minutes.
const fn default_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// How long a computed snapshot stays valid, in seconds. Also the age
    /// after which the store reports its data as stale.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
