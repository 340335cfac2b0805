//! Derived organization snapshot types.
//!
//! An `OrganizationSnapshot` is rebuilt from all raw collections on every
//! recomputation and never patched in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ControlStatus;

/// Record counts per raw collection (controls counted after deduplication).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Totals {
    pub projects: u32,
    pub risks: u32,
    pub controls: u32,
    pub evidence: u32,
    pub users: u32,
    pub auditors: u32,
    pub todos: u32,
    pub frameworks: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProjectBreakdown {
    pub completed: u32,
    pub in_progress: u32,
    pub not_started: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RiskBreakdown {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskBreakdown {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ControlBreakdown {
    pub implemented: u32,
    pub in_progress: u32,
    pub not_started: u32,
}

impl ControlBreakdown {
    pub const fn record(&mut self, status: ControlStatus) {
        match status {
            ControlStatus::Implemented => self.implemented += 1,
            ControlStatus::InProgress => self.in_progress += 1,
            ControlStatus::NotStarted => self.not_started += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.implemented + self.in_progress + self.not_started
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EvidenceBreakdown {
    pub collected: u32,
    pub pending: u32,
    pub missing: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserBreakdown {
    pub active: u32,
    pub pending_approval: u32,
    pub inactive: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TodoBreakdown {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub completed: u32,
}

/// Per-category status counts for every record family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusBreakdowns {
    pub projects: ProjectBreakdown,
    pub risks: RiskBreakdown,
    pub controls: ControlBreakdown,
    pub evidence: EvidenceBreakdown,
    pub users: UserBreakdown,
    pub todos: TodoBreakdown,
}

/// Weighted scores and the rates they are built from.
///
/// Scores are rounded integers. Rates keep full precision so consumers can
/// render them with their own rounding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Scores {
    pub security: u32,
    pub privacy: u32,
    pub regulatory: u32,
    pub compliance: u32,
    pub control_implementation_rate: f64,
    /// Not clamped: exceeds 100 when evidence outnumbers controls.
    pub evidence_collection_rate: f64,
    pub project_completion_rate: f64,
    pub risk_management_score: f64,
}

/// Compliance of the controls grouped under one framework.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FrameworkCompliance {
    pub framework_id: String,
    pub name: String,
    pub total_controls: u32,
    pub implemented_controls: u32,
    pub compliance_percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Project,
    Risk,
}

/// A recently created project or risk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// The derived, read-only aggregate view over all raw collections.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OrganizationSnapshot {
    pub totals: Totals,
    pub breakdowns: StatusBreakdowns,
    pub scores: Scores,
    pub framework_compliance: Vec<FrameworkCompliance>,
    pub recent_activity: Vec<ActivityItem>,
    /// Controls with at least one linked evidence item through any linkage path.
    pub controls_with_evidence: u32,
    /// Resolved status per (deduplicated) control id.
    pub control_statuses: BTreeMap<String, ControlStatus>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_breakdown_records_each_status() {
        let mut breakdown = ControlBreakdown::default();
        breakdown.record(ControlStatus::Implemented);
        breakdown.record(ControlStatus::Implemented);
        breakdown.record(ControlStatus::NotStarted);
        assert_eq!(breakdown.implemented, 2);
        assert_eq!(breakdown.in_progress, 0);
        assert_eq!(breakdown.total(), 3);
    }

    #[test]
    fn risk_breakdown_total() {
        let breakdown = RiskBreakdown {
            low: 1,
            medium: 2,
            high: 3,
            critical: 4,
        };
        assert_eq!(breakdown.total(), 10);
    }
}
