//! # pulse-config
//!
//! Layered configuration loading for Compliance Pulse using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`PULSE_*` prefix, `__` as separator)
//! 2. Project-level `.pulse/config.toml`
//! 3. User-level `~/.config/pulse/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PULSE_API__BASE_URL` -> `api.base_url`,
//! `PULSE_CACHE__TTL_SECS` -> `cache.ttl_secs`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use pulse_config::PulseConfig;
//!
//! let config = PulseConfig::load_with_dotenv().expect("config");
//! config.require_api().expect("api section");
//! println!("API: {}", config.api.base_url);
//! ```

mod api;
mod cache;
mod engine;
mod error;

pub use api::ApiConfig;
pub use cache::CacheConfig;
pub use engine::EngineConfig;
pub use error::ConfigError;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl PulseConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can add providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".pulse/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("PULSE_").split("__"))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.engine.activity_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.activity_limit",
                reason: "must be greater than zero".into(),
            });
        }
        if self.api.is_configured()
            && !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url",
                reason: format!("expected an http(s) URL, got '{}'", self.api.base_url),
            });
        }
        Ok(())
    }

    /// Fail unless the API section can reach an upstream.
    pub fn require_api(&self) -> Result<&ApiConfig, ConfigError> {
        if self.api.is_configured() {
            Ok(&self.api)
        } else {
            Err(ConfigError::NotConfigured {
                section: "api",
            })
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pulse").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) looking for a `.env`
    /// file, then falls back to the current directory. Silently does nothing
    /// if none is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
