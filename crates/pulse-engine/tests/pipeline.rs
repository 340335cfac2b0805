//! End-to-end: wire-format fixtures through the public store API.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use pulse_api::{ApiError, ComplianceApi};
use pulse_config::PulseConfig;
use pulse_core::entities::{
    Auditor, AuditorReview, Control, Evidence, Framework, Project, Risk, Todo, User,
};
use pulse_core::enums::{ControlStatus, Resource};
use pulse_engine::{Recompute, SnapshotStore};
use serde_json::json;

struct FixtureApi {
    projects: Vec<Project>,
    risks: Vec<Risk>,
    frameworks: Vec<Framework>,
    controls: HashMap<String, Vec<Control>>,
    evidence: HashMap<String, Vec<Evidence>>,
    reviews: HashMap<String, Vec<AuditorReview>>,
    review_calls: AtomicUsize,
}

fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

impl FixtureApi {
    fn organization() -> Self {
        Self {
            projects: parse(json!([
                { "id": "prj-1", "name": "SOC 2", "status": "Completed", "framework_id": "fw-soc2" },
                { "id": "prj-2", "name": "ISO", "status": "In Progress", "framework_id": "fw-iso" },
            ])),
            risks: parse(json!([
                { "id": "rsk-1", "title": "Vendor", "level": "low" },
                { "id": "rsk-2", "title": "Backups", "level": "low" },
                { "id": "rsk-3", "title": "Access", "level": "critical" },
            ])),
            frameworks: parse(json!([
                { "id": "fw-soc2", "name": "SOC 2" },
                { "id": "fw-iso", "name": "ISO 27001" },
            ])),
            controls: HashMap::from([
                ("prj-1".to_string(), parse(json!([
                    { "id": "ctl-a", "title": "Access reviews", "framework_id": "fw-soc2" },
                    { "id": "ctl-b", "title": "Encryption", "framework_id": "fw-soc2",
                      "subcontrols": [{ "id": "sub-1" }, { "id": "sub-2" }] },
                ]))),
                ("prj-2".to_string(), parse(json!([
                    { "id": "ctl-a", "title": "Access reviews", "framework_id": "fw-soc2" },
                    { "id": "ctl-c", "title": "Logging", "framework_id": "fw-iso" },
                    { "id": "ctl-d", "title": "Change mgmt", "framework_id": "fw-iso",
                      "subcontrols": [{ "id": "sub-3" }] },
                ]))),
            ]),
            evidence: HashMap::from([
                ("prj-1".to_string(), parse(json!([
                    { "id": "evd-1", "status": "collected", "clauses": ["sub-1"] },
                    { "id": "evd-2", "status": "collected", "subcontrol_id": "sub-2" },
                ]))),
                ("prj-2".to_string(), parse(json!([
                    { "id": "evd-3", "status": "pending" },
                ]))),
            ]),
            reviews: HashMap::from([
                ("ctl-a".to_string(), parse(json!([
                    { "id": "rev-1", "status": "Accepted" },
                ]))),
                ("ctl-b".to_string(), parse(json!([
                    { "id": "rev-2", "subcontrol_id": "sub-1", "status": "Accepted" },
                    { "id": "rev-3", "subcontrol_id": "sub-2", "status": "Accepted" },
                ]))),
            ]),
            review_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ComplianceApi for FixtureApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        Ok(self.projects.clone())
    }

    async fn list_risks(&self) -> Result<Vec<Risk>, ApiError> {
        Ok(self.risks.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_auditors(&self) -> Result<Vec<Auditor>, ApiError> {
        Err(ApiError::Api {
            status: 503,
            message: "auditors offline".into(),
        })
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        Ok(Vec::new())
    }

    async fn list_frameworks(&self) -> Result<Vec<Framework>, ApiError> {
        Ok(self.frameworks.clone())
    }

    async fn list_controls(&self, project_id: &str) -> Result<Vec<Control>, ApiError> {
        Ok(self.controls.get(project_id).cloned().unwrap_or_default())
    }

    async fn list_evidence(&self, project_id: &str) -> Result<Vec<Evidence>, ApiError> {
        Ok(self.evidence.get(project_id).cloned().unwrap_or_default())
    }

    async fn list_reviews(&self, control_id: &str) -> Result<Vec<AuditorReview>, ApiError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reviews.get(control_id).cloned().unwrap_or_default())
    }
}

#[tokio::test(start_paused = true)]
async fn organization_snapshot_end_to_end() {
    let api = Arc::new(FixtureApi::organization());
    let store = SnapshotStore::new(api.clone(), &PulseConfig::default());

    store.fetch_all().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    // one review request per fetched control, duplicates included
    assert_eq!(api.review_calls.load(Ordering::SeqCst), 5);

    let view = store.view();
    assert_eq!(view.controls.len(), 5);
    assert!(view.has_errors);
    assert_eq!(view.errors_by_resource.keys().copied().collect::<Vec<_>>(), vec![Resource::Auditors]);
    assert!(!view.is_loading);
    assert!(!view.is_data_stale);

    let snapshot = view.organization_snapshot.expect("snapshot computed");
    assert_eq!(snapshot.totals.controls, 4);
    assert_eq!(snapshot.totals.evidence, 3);
    assert_eq!(snapshot.totals.auditors, 0);
    assert_eq!(snapshot.totals.frameworks, 2);

    assert_eq!(snapshot.control_statuses["ctl-a"], ControlStatus::Implemented);
    assert_eq!(snapshot.control_statuses["ctl-b"], ControlStatus::Implemented);
    assert_eq!(snapshot.control_statuses["ctl-c"], ControlStatus::InProgress);
    assert_eq!(snapshot.control_statuses["ctl-d"], ControlStatus::NotStarted);
    assert_eq!(snapshot.breakdowns.controls.total(), 4);
    assert_eq!(snapshot.controls_with_evidence, 1);

    assert_eq!(snapshot.scores.control_implementation_rate, 50.0);
    assert_eq!(snapshot.scores.evidence_collection_rate, 50.0);
    assert_eq!(snapshot.scores.security, 50);
    assert_eq!(snapshot.scores.privacy, 75);
    assert_eq!(snapshot.scores.regulatory, 50);
    assert_eq!(snapshot.scores.compliance, 59);

    let frameworks: Vec<(&str, u32, u32)> = snapshot
        .framework_compliance
        .iter()
        .map(|f| (f.framework_id.as_str(), f.total_controls, f.compliance_percentage))
        .collect();
    assert_eq!(frameworks, vec![("fw-soc2", 2, 100), ("fw-iso", 2, 0)]);
}

#[tokio::test(start_paused = true)]
async fn snapshot_serializes_with_snake_case_keys() {
    let store = SnapshotStore::new(Arc::new(FixtureApi::organization()), &PulseConfig::default());
    store.fetch_all().await.unwrap();
    assert_eq!(store.recalculate_now().unwrap(), Recompute::Computed);

    let json = serde_json::to_value(store.view()).unwrap();
    assert_eq!(json["errors_by_resource"]["auditors"], json!("API error (503): auditors offline"));
    assert_eq!(json["loading_by_resource"]["controls"], json!(false));
    assert_eq!(
        json["organization_snapshot"]["control_statuses"]["ctl-c"],
        json!("in_progress")
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_recompute_reuses_cached_snapshot() {
    let store = SnapshotStore::new(Arc::new(FixtureApi::organization()), &PulseConfig::default());
    store.fetch_all().await.unwrap();

    assert_eq!(store.recalculate_now().unwrap(), Recompute::Computed);
    let first = store.snapshot().unwrap();
    assert_eq!(store.recalculate_now().unwrap(), Recompute::CacheHit);
    assert_eq!(store.snapshot().unwrap(), first);
    assert_eq!(store.stats().computations, 1);
}
