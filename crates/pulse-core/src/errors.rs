//! Cross-cutting error types for Compliance Pulse.
//!
//! Domain-specific errors (`ApiError`, `MetricsError`, `ConfigError`) live in
//! their respective crates.

use thiserror::Error;

/// Errors that can be raised by any Pulse crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Record lookup returned no result.
    #[error("Record not found: {record_type} {id}")]
    NotFound { record_type: String, id: String },

    /// A status string did not match any known variant.
    #[error("Unknown {kind} value: {value}")]
    UnknownStatus { kind: &'static str, value: String },

    /// Data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
