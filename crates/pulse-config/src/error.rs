//! Errors raised while loading or checking a [`PulseConfig`](crate::PulseConfig).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer (file, `.env` or `PULSE_*` variable) failed to parse or merge.
    #[error("failed to load pulse configuration: {0}")]
    Figment(#[from] figment::Error),

    /// `api`, `cache` or `engine` lacks a value the caller needs.
    #[error(
        "[{section}] is not configured; set it in .pulse/config.toml or via PULSE_{}__* variables",
        section.to_uppercase()
    )]
    NotConfigured { section: &'static str },

    /// A dotted `section.field` path holding an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
