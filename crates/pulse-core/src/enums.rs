//! Status enums and resource identifiers for Compliance Pulse.
//!
//! Upstream status strings are matched exactly as the compliance API emits
//! them. Record families whose status only feeds a breakdown fall back to a
//! catch-all variant (`#[serde(other)]`) so one odd record never fails a
//! whole collection.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

macro_rules! impl_display_from_str {
    ($ty:ty, $kind:literal, [$($variant:ident => $text:literal),+ $(,)?]) => {
        impl $ty {
            /// Return the wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(CoreError::UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

/// Delivery status of a compliance project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ProjectStatus {
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(other, rename = "Unknown")]
    Unknown,
}

impl_display_from_str!(ProjectStatus, "project status", [
    Completed => "Completed",
    InProgress => "In Progress",
    NotStarted => "Not Started",
    Unknown => "Unknown",
]);

// ---------------------------------------------------------------------------
// ReviewStatus
// ---------------------------------------------------------------------------

/// Verdict of an auditor review on a control or subcontrol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ReviewStatus {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Pending Updates")]
    PendingUpdates,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(other, rename = "Unknown")]
    Unknown,
}

impl_display_from_str!(ReviewStatus, "review status", [
    Accepted => "Accepted",
    PendingUpdates => "Pending Updates",
    Rejected => "Rejected",
    Unknown => "Unknown",
]);

impl ReviewStatus {
    /// Whether the verdict signals work under way (not accepted, not ignored).
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::PendingUpdates | Self::Rejected)
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// Severity of a registered risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
    #[serde(alias = "Critical")]
    Critical,
    /// Unrecognized severity. Counted in totals, left out of the breakdown
    /// and the risk management score.
    #[serde(other)]
    Unknown,
}

impl_display_from_str!(RiskLevel, "risk level", [
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
    Unknown => "unknown",
]);

impl RiskLevel {
    /// Weight used by the risk management score (low risks score highest).
    /// `Unknown` never reaches the score and weighs nothing.
    #[must_use]
    pub const fn score_weight(self) -> u32 {
        match self {
            Self::Low => 100,
            Self::Medium => 75,
            Self::High => 50,
            Self::Critical => 25,
            Self::Unknown => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// EvidenceStatus
// ---------------------------------------------------------------------------

/// Collection state of an evidence artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    Collected,
    Pending,
    #[serde(other)]
    Missing,
}

impl_display_from_str!(EvidenceStatus, "evidence status", [
    Collected => "collected",
    Pending => "pending",
    Missing => "missing",
]);

// ---------------------------------------------------------------------------
// UserStatus
// ---------------------------------------------------------------------------

/// Account state of an organization user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    #[serde(alias = "pending")]
    PendingApproval,
    #[serde(other)]
    Inactive,
}

impl_display_from_str!(UserStatus, "user status", [
    Active => "active",
    PendingApproval => "pending_approval",
    Inactive => "inactive",
]);

// ---------------------------------------------------------------------------
// TodoStatus
// ---------------------------------------------------------------------------

/// Workflow state of a to-do item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Approved,
    Rejected,
    Completed,
    #[serde(other)]
    Pending,
}

impl_display_from_str!(TodoStatus, "todo status", [
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
]);

// ---------------------------------------------------------------------------
// ControlStatus
// ---------------------------------------------------------------------------

/// Derived implementation status of a control or subcontrol.
///
/// Never stored upstream; always computed from reviews and evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Implemented,
    InProgress,
    NotStarted,
}

impl_display_from_str!(ControlStatus, "control status", [
    Implemented => "implemented",
    InProgress => "in_progress",
    NotStarted => "not_started",
]);

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A top-level collection held by the snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Projects,
    Risks,
    Controls,
    Evidence,
    Users,
    Auditors,
    Todos,
    Frameworks,
}

impl_display_from_str!(Resource, "resource", [
    Projects => "projects",
    Risks => "risks",
    Controls => "controls",
    Evidence => "evidence",
    Users => "users",
    Auditors => "auditors",
    Todos => "todos",
    Frameworks => "frameworks",
]);

impl Resource {
    /// Every resource, in fetch order.
    pub const ALL: [Self; 8] = [
        Self::Projects,
        Self::Risks,
        Self::Users,
        Self::Auditors,
        Self::Todos,
        Self::Frameworks,
        Self::Controls,
        Self::Evidence,
    ];

    /// Resources whose fetch needs project identifiers first.
    #[must_use]
    pub const fn is_project_scoped(self) -> bool {
        matches!(self, Self::Controls | Self::Evidence)
    }
}
