use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EvidenceStatus;

/// An artifact submitted in support of one or more controls or subcontrols.
///
/// Linkage paths:
/// - `control_ids` ("clauses"): many-to-many set of control or subcontrol ids
/// - `subcontrol_id`: direct subcontrol reference
/// - the per-project override mapping, see [`crate::overrides::EvidenceOverrides`]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Evidence {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub status: EvidenceStatus,
    #[serde(default, alias = "clauses")]
    pub control_ids: Vec<String>,
    #[serde(default)]
    pub subcontrol_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Evidence {
    /// Whether the clause set names `id`.
    #[must_use]
    pub fn names_in_clauses(&self, id: &str) -> bool {
        self.control_ids.iter().any(|c| c == id)
    }
}
