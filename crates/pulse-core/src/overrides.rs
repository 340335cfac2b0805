//! Explicit evidence → subcontrol override mapping.
//!
//! Older clients recorded which subcontrol an evidence item belonged to in a
//! local key-value side channel keyed by project and control. The mapping is
//! now an ordinary input owned by the snapshot store and handed to status
//! resolution alongside the evidence collection.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `project_id → control_id → evidence_id → subcontrol_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct EvidenceOverrides {
    by_project: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl EvidenceOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `evidence_id` supports `subcontrol_id` under the given
    /// project and control. Replaces any earlier mapping for that evidence.
    pub fn insert(
        &mut self,
        project_id: impl Into<String>,
        control_id: impl Into<String>,
        evidence_id: impl Into<String>,
        subcontrol_id: impl Into<String>,
    ) {
        self.by_project
            .entry(project_id.into())
            .or_default()
            .entry(control_id.into())
            .or_default()
            .insert(evidence_id.into(), subcontrol_id.into());
    }

    /// Subcontrol the evidence is mapped to under `project_id`/`control_id`.
    #[must_use]
    pub fn lookup(&self, project_id: &str, control_id: &str, evidence_id: &str) -> Option<&str> {
        self.by_project
            .get(project_id)?
            .get(control_id)?
            .get(evidence_id)
            .map(String::as_str)
    }

    /// Whether the mapping links `evidence_id` to `subcontrol_id`.
    #[must_use]
    pub fn links(
        &self,
        project_id: &str,
        control_id: &str,
        evidence_id: &str,
        subcontrol_id: &str,
    ) -> bool {
        self.lookup(project_id, control_id, evidence_id) == Some(subcontrol_id)
    }

    /// Number of evidence → subcontrol entries across all projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_project
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
