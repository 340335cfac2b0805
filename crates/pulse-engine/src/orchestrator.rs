//! Two-level parallel fetch of every raw collection.
//!
//! 1. Independent batch: projects, risks, users, auditors, todos, and
//!    frameworks in one `tokio::join!` group.
//! 2. Dependent batch, once project ids are known: controls and evidence per
//!    project, fanned out on a `JoinSet`; then reviews per returned control,
//!    fanned out again and attached to their control.
//!
//! Leaf failures in the dependent batch are logged and the affected project
//! or control is left out. No timeouts or retries are applied here.

use std::sync::Arc;

use pulse_api::{ApiError, ComplianceApi};
use pulse_core::entities::{Auditor, Control, Evidence, Framework, Project, Risk, Todo, User};
use tokio::task::JoinSet;

use crate::error::FetchError;
use crate::phase::{Phase, PhaseGuard, PhaseSlot};

/// Result of the independent batch. Each resource succeeds or fails alone.
#[derive(Debug)]
pub struct IndependentBatch {
    pub projects: Result<Vec<Project>, ApiError>,
    pub risks: Result<Vec<Risk>, ApiError>,
    pub users: Result<Vec<User>, ApiError>,
    pub auditors: Result<Vec<Auditor>, ApiError>,
    pub todos: Result<Vec<Todo>, ApiError>,
    pub frameworks: Result<Vec<Framework>, ApiError>,
}

impl IndependentBatch {
    /// Ids of the fetched projects, empty if the projects request failed.
    #[must_use]
    pub fn project_ids(&self) -> Vec<String> {
        self.projects
            .as_ref()
            .map(|projects| projects.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default()
    }
}

/// Result of the project-scoped batch.
#[derive(Debug, Default)]
pub struct DependentBatch {
    /// Controls with their reviews attached, in project order.
    pub controls: Vec<Control>,
    pub evidence: Vec<Evidence>,
    /// Leaf requests that failed and were left out.
    pub failed_requests: usize,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub independent: IndependentBatch,
    pub dependent: DependentBatch,
}

/// Owns the API handle and the fetch-in-progress slot.
pub struct FetchOrchestrator {
    api: Arc<dyn ComplianceApi>,
    slot: PhaseSlot,
}

/// One fetch pass. Holding it keeps other passes out; dropping it lets them in.
pub struct FetchPass {
    api: Arc<dyn ComplianceApi>,
    _guard: PhaseGuard,
}

impl FetchOrchestrator {
    #[must_use]
    pub fn new(api: Arc<dyn ComplianceApi>) -> Self {
        Self {
            api,
            slot: PhaseSlot::new(Phase::Fetching),
        }
    }

    /// Start a pass, or `None` while another one is in flight.
    #[must_use]
    pub fn try_begin(&self) -> Option<FetchPass> {
        let guard = self.slot.try_enter()?;
        Some(FetchPass {
            api: Arc::clone(&self.api),
            _guard: guard,
        })
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.slot.is_active()
    }

    /// Run both batches back to back.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AlreadyInFlight`] if another pass is running.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, FetchError> {
        let pass = self.try_begin().ok_or(FetchError::AlreadyInFlight)?;
        let independent = pass.fetch_independent().await;
        let dependent = pass.fetch_dependent(&independent.project_ids()).await;
        Ok(FetchOutcome {
            independent,
            dependent,
        })
    }
}

impl FetchPass {
    pub async fn fetch_independent(&self) -> IndependentBatch {
        let api = self.api.as_ref();
        let (projects, risks, users, auditors, todos, frameworks) = tokio::join!(
            api.list_projects(),
            api.list_risks(),
            api.list_users(),
            api.list_auditors(),
            api.list_todos(),
            api.list_frameworks(),
        );

        let batch = IndependentBatch {
            projects,
            risks,
            users,
            auditors,
            todos,
            frameworks,
        };
        log_failure("projects", batch.projects.as_ref().err());
        log_failure("risks", batch.risks.as_ref().err());
        log_failure("users", batch.users.as_ref().err());
        log_failure("auditors", batch.auditors.as_ref().err());
        log_failure("todos", batch.todos.as_ref().err());
        log_failure("frameworks", batch.frameworks.as_ref().err());
        batch
    }

    pub async fn fetch_dependent(&self, project_ids: &[String]) -> DependentBatch {
        let mut batch = DependentBatch::default();

        let mut per_project = JoinSet::new();
        for (idx, project_id) in project_ids.iter().enumerate() {
            let api = Arc::clone(&self.api);
            let project_id = project_id.clone();
            per_project.spawn(async move {
                let (controls, evidence) =
                    tokio::join!(api.list_controls(&project_id), api.list_evidence(&project_id));
                (idx, project_id, controls, evidence)
            });
        }

        let mut slots: Vec<Option<(Vec<Control>, Vec<Evidence>)>> = vec![None; project_ids.len()];
        while let Some(joined) = per_project.join_next().await {
            let (idx, project_id, controls, evidence) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(%e, "project fetch task failed");
                    batch.failed_requests += 2;
                    continue;
                }
            };
            let controls = controls
                .map(|controls| {
                    controls
                        .into_iter()
                        .map(|mut control| {
                            control.project_id.get_or_insert_with(|| project_id.clone());
                            control
                        })
                        .collect()
                })
                .unwrap_or_else(|e| {
                    tracing::warn!(%project_id, %e, "controls fetch failed; project omitted");
                    batch.failed_requests += 1;
                    Vec::new()
                });
            let evidence = evidence
                .map(|evidence| {
                    evidence
                        .into_iter()
                        .map(|mut item| {
                            item.project_id.get_or_insert_with(|| project_id.clone());
                            item
                        })
                        .collect()
                })
                .unwrap_or_else(|e| {
                    tracing::warn!(%project_id, %e, "evidence fetch failed; project omitted");
                    batch.failed_requests += 1;
                    Vec::new()
                });
            slots[idx] = Some((controls, evidence));
        }

        let mut controls = Vec::new();
        for (project_controls, project_evidence) in slots.into_iter().flatten() {
            controls.extend(project_controls);
            batch.evidence.extend(project_evidence);
        }

        let (with_reviews, failed) = self.attach_reviews(controls).await;
        batch.controls = with_reviews;
        batch.failed_requests += failed;

        tracing::debug!(
            projects = project_ids.len(),
            controls = batch.controls.len(),
            evidence = batch.evidence.len(),
            failed = batch.failed_requests,
            "dependent batch fetched"
        );
        batch
    }

    /// Fetch every control's reviews in parallel. Controls whose request
    /// fails are dropped.
    async fn attach_reviews(&self, controls: Vec<Control>) -> (Vec<Control>, usize) {
        let mut set = JoinSet::new();
        for (idx, control) in controls.iter().enumerate() {
            let api = Arc::clone(&self.api);
            let control_id = control.id.clone();
            set.spawn(async move { (idx, api.list_reviews(&control_id).await) });
        }

        let mut reviews = vec![None; controls.len()];
        let mut failed = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(found))) => reviews[idx] = Some(found),
                Ok((idx, Err(e))) => {
                    tracing::warn!(control_id = %controls[idx].id, %e, "reviews fetch failed; control omitted");
                    failed += 1;
                }
                Err(e) => {
                    tracing::warn!(%e, "reviews fetch task failed");
                    failed += 1;
                }
            }
        }

        let attached = controls
            .into_iter()
            .zip(reviews)
            .filter_map(|(mut control, found)| {
                control.reviews = found?;
                Some(control)
            })
            .collect();
        (attached, failed)
    }
}

fn log_failure(resource: &str, error: Option<&ApiError>) {
    if let Some(e) = error {
        tracing::warn!(resource, %e, "resource fetch failed");
    }
}
