//! Engine error types.

use thiserror::Error;

/// Errors from the fetch orchestrator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Another fetch pass holds the fetch-in-progress guard.
    #[error("a fetch is already in flight")]
    AlreadyInFlight,

    /// The task running the fetch pass panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Errors raised while computing a snapshot.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A rate or score came out as NaN, infinite, or negative.
    #[error("metric '{metric}' is not a finite non-negative number: {value}")]
    NonFinite { metric: &'static str, value: f64 },
}

/// Errors surfaced by the snapshot store's constructors and commands.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] pulse_config::ConfigError),

    #[error(transparent)]
    Api(#[from] pulse_api::ApiError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
