//! # pulse-api
//!
//! Compliance API client surface for Compliance Pulse.
//!
//! The snapshot engine never talks HTTP directly. It is handed an
//! implementation of [`ComplianceApi`], usually [`HttpComplianceApi`] built
//! from an already-authenticated `reqwest::Client`, and tests substitute an
//! in-memory implementation.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET /projects`, `/risks`, `/users`, `/auditors`, `/todos`, `/frameworks`
//! - `GET /projects/{id}/controls`, `/projects/{id}/evidence`
//! - `GET /controls/{id}/reviews`

mod error;
mod http;

pub use error::ApiError;

use async_trait::async_trait;
use pulse_config::ApiConfig;
use pulse_core::entities::{
    Auditor, AuditorReview, Control, Evidence, Framework, Project, Risk, Todo, User,
};
use serde::de::DeserializeOwned;

use crate::http::{check_response, decode_list};

// ── Trait ──────────────────────────────────────────────────────────

/// Authenticated list endpoints of the upstream compliance API.
#[async_trait]
pub trait ComplianceApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn list_risks(&self) -> Result<Vec<Risk>, ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    async fn list_auditors(&self) -> Result<Vec<Auditor>, ApiError>;
    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError>;
    async fn list_frameworks(&self) -> Result<Vec<Framework>, ApiError>;
    /// Controls (with subcontrols) visible to one project.
    async fn list_controls(&self, project_id: &str) -> Result<Vec<Control>, ApiError>;
    /// Evidence submitted under one project.
    async fn list_evidence(&self, project_id: &str) -> Result<Vec<Evidence>, ApiError>;
    /// Auditor reviews on one control and its subcontrols.
    async fn list_reviews(&self, control_id: &str) -> Result<Vec<AuditorReview>, ApiError>;
}

// ── Client ─────────────────────────────────────────────────────────

/// `reqwest`-backed [`ComplianceApi`].
pub struct HttpComplianceApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpComplianceApi {
    /// Wrap a client supplied by the transport layer (which already handles
    /// authentication and refresh).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an http(s) URL.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: None,
        })
    }

    /// Build a client from configuration, attaching the static bearer token
    /// when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the base URL is invalid or the underlying
    /// `reqwest::Client` fails to build.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("compliance-pulse/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        let mut api = Self::with_client(http, &config.base_url)?;
        api.token = config.bearer_token().map(str::to_string);
        Ok(api)
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn list<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, ApiError> {
        let url = self.url(segments);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = check_response(request.send().await?).await?;
        let body = resp.text().await?;
        let items = decode_list(&body)?;
        tracing::debug!(%url, count = items.len(), "fetched list");
        Ok(items)
    }
}

#[async_trait]
impl ComplianceApi for HttpComplianceApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.list(&["projects"]).await
    }

    async fn list_risks(&self) -> Result<Vec<Risk>, ApiError> {
        self.list(&["risks"]).await
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.list(&["users"]).await
    }

    async fn list_auditors(&self) -> Result<Vec<Auditor>, ApiError> {
        self.list(&["auditors"]).await
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        self.list(&["todos"]).await
    }

    async fn list_frameworks(&self) -> Result<Vec<Framework>, ApiError> {
        self.list(&["frameworks"]).await
    }

    async fn list_controls(&self, project_id: &str) -> Result<Vec<Control>, ApiError> {
        self.list(&["projects", project_id, "controls"]).await
    }

    async fn list_evidence(&self, project_id: &str) -> Result<Vec<Evidence>, ApiError> {
        self.list(&["projects", project_id, "evidence"]).await
    }

    async fn list_reviews(&self, control_id: &str) -> Result<Vec<AuditorReview>, ApiError> {
        self.list(&["controls", control_id, "reviews"]).await
    }
}
