use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ReviewStatus;

/// A compliance requirement, either reviewed directly or decomposed into
/// subcontrols.
///
/// `reviews` is not part of the upstream control payload; the fetch
/// orchestrator fills it from the per-control reviews endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Control {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub framework_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub subcontrols: Vec<Subcontrol>,
    #[serde(default)]
    pub reviews: Vec<AuditorReview>,
}

impl Control {
    /// Reviews scoped to the control itself (no subcontrol reference).
    pub fn control_reviews(&self) -> impl Iterator<Item = &AuditorReview> {
        self.reviews.iter().filter(|r| r.subcontrol_id.is_none())
    }

    /// Reviews scoped to the given subcontrol. The yielded reviews borrow
    /// the control only, not `subcontrol_id`.
    pub fn subcontrol_reviews<'a, 'id>(
        &'a self,
        subcontrol_id: &'id str,
    ) -> impl Iterator<Item = &'a AuditorReview> + use<'a, 'id> {
        self.reviews
            .iter()
            .filter(move |r| r.subcontrol_id.as_deref() == Some(subcontrol_id))
    }
}

/// A granular sub-requirement owned by exactly one control.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Subcontrol {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub control_id: Option<String>,
}

/// A reviewer's verdict on a control or one of its subcontrols.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditorReview {
    pub id: String,
    #[serde(default)]
    pub control_id: Option<String>,
    #[serde(default)]
    pub subcontrol_id: Option<String>,
    pub status: ReviewStatus,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
