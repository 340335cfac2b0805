//! Shared test utilities: record builders and an in-memory `ComplianceApi`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_api::{ApiError, ComplianceApi};
use pulse_core::entities::{
    Auditor, AuditorReview, Control, Evidence, Framework, Project, Risk, Subcontrol, Todo, User,
};
use pulse_core::enums::{EvidenceStatus, ProjectStatus, ReviewStatus, RiskLevel};

pub fn project(id: &str) -> Project {
    Project {
        id: id.into(),
        name: format!("Project {id}"),
        status: ProjectStatus::NotStarted,
        framework_id: None,
        organization_id: None,
        created_at: None,
    }
}

pub fn project_with(id: &str, status: ProjectStatus, created_at: Option<DateTime<Utc>>) -> Project {
    Project {
        status,
        created_at,
        ..project(id)
    }
}

pub fn control(id: &str) -> Control {
    Control {
        id: id.into(),
        title: format!("Control {id}"),
        framework_id: None,
        project_id: None,
        subcontrols: Vec::new(),
        reviews: Vec::new(),
    }
}

pub fn subcontrol(id: &str) -> Subcontrol {
    Subcontrol {
        id: id.into(),
        title: format!("Subcontrol {id}"),
        control_id: None,
    }
}

pub fn review(id: &str, subcontrol_id: Option<&str>, status: ReviewStatus) -> AuditorReview {
    AuditorReview {
        id: id.into(),
        control_id: None,
        subcontrol_id: subcontrol_id.map(Into::into),
        status,
        reviewer: None,
        created_at: None,
    }
}

pub fn evidence(id: &str, status: EvidenceStatus) -> Evidence {
    Evidence {
        id: id.into(),
        title: String::new(),
        project_id: None,
        status,
        control_ids: Vec::new(),
        subcontrol_id: None,
        created_at: None,
    }
}

pub fn risk(id: &str, level: RiskLevel) -> Risk {
    Risk {
        id: id.into(),
        title: format!("Risk {id}"),
        level,
        created_at: None,
    }
}

/// Upstream records served by [`MockApi`].
#[derive(Debug, Clone, Default)]
pub struct MockData {
    pub projects: Vec<Project>,
    pub risks: Vec<Risk>,
    pub users: Vec<User>,
    pub auditors: Vec<Auditor>,
    pub todos: Vec<Todo>,
    pub frameworks: Vec<Framework>,
    pub controls_by_project: HashMap<String, Vec<Control>>,
    pub evidence_by_project: HashMap<String, Vec<Evidence>>,
    pub reviews_by_control: HashMap<String, Vec<AuditorReview>>,
    /// Request keys that answer with HTTP 500: `projects`, `controls:{project}`,
    /// `evidence:{project}`, `reviews:{control}`, ...
    pub failing: HashSet<String>,
    /// Artificial latency applied to the projects request.
    pub projects_delay: Option<Duration>,
}

/// In-memory [`ComplianceApi`] with per-request failure injection.
#[derive(Debug, Default)]
pub struct MockApi {
    data: Mutex<MockData>,
    calls: AtomicUsize,
}

impl MockApi {
    pub fn new(data: MockData) -> Self {
        Self {
            data: Mutex::new(data),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut MockData)) {
        f(&mut self.data.lock().unwrap());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn serve<T: Clone>(&self, key: &str, pick: impl FnOnce(&MockData) -> Vec<T>) -> Result<Vec<T>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data.lock().unwrap();
        if data.failing.contains(key) {
            return Err(ApiError::Api {
                status: 500,
                message: format!("{key} unavailable"),
            });
        }
        Ok(pick(&data))
    }
}

#[async_trait]
impl ComplianceApi for MockApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let delay = self.data.lock().unwrap().projects_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.serve("projects", |d| d.projects.clone())
    }

    async fn list_risks(&self) -> Result<Vec<Risk>, ApiError> {
        self.serve("risks", |d| d.risks.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.serve("users", |d| d.users.clone())
    }

    async fn list_auditors(&self) -> Result<Vec<Auditor>, ApiError> {
        self.serve("auditors", |d| d.auditors.clone())
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        self.serve("todos", |d| d.todos.clone())
    }

    async fn list_frameworks(&self) -> Result<Vec<Framework>, ApiError> {
        self.serve("frameworks", |d| d.frameworks.clone())
    }

    async fn list_controls(&self, project_id: &str) -> Result<Vec<Control>, ApiError> {
        self.serve(&format!("controls:{project_id}"), |d| {
            d.controls_by_project.get(project_id).cloned().unwrap_or_default()
        })
    }

    async fn list_evidence(&self, project_id: &str) -> Result<Vec<Evidence>, ApiError> {
        self.serve(&format!("evidence:{project_id}"), |d| {
            d.evidence_by_project.get(project_id).cloned().unwrap_or_default()
        })
    }

    async fn list_reviews(&self, control_id: &str) -> Result<Vec<AuditorReview>, ApiError> {
        self.serve(&format!("reviews:{control_id}"), |d| {
            d.reviews_by_control.get(control_id).cloned().unwrap_or_default()
        })
    }
}
