//! Snapshot engine tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_debounce_ms() -> u64 {
    300
}

const fn default_activity_window_days() -> u32 {
    30
}

const fn default_activity_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Quiet period after the last collection change before recomputing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Projects and risks created within this many days count as recent activity.
    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: u32,

    /// Maximum number of recent-activity entries in a snapshot.
    #[serde(default = "default_activity_limit")]
    pub activity_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            activity_window_days: default_activity_window_days(),
            activity_limit: default_activity_limit(),
        }
    }
}

impl EngineConfig {
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.activity_window_days, 30);
        assert_eq!(config.activity_limit, 10);
    }
}
