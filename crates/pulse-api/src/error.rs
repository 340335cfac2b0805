//! Compliance API error types.

use thiserror::Error;

/// Errors that can occur when talking to the compliance API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot be used.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    /// The API returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },
}
