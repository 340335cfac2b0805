//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`ApiError::Api`]) and list-body decoding so the
//! endpoint methods stay focused on request construction.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`ApiError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`ApiError::Api`] with status code and
///   response body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(ApiError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(ApiError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

/// List endpoints answer with a bare array; some deployments wrap it.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Results { results: Vec<T> },
}

/// Decode a list endpoint body into records.
pub fn decode_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ApiError> {
    let parsed: ListBody<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(match parsed {
        ListBody::Bare(items) | ListBody::Data { data: items } | ListBody::Results { results: items } => {
            items
        }
    })
}
