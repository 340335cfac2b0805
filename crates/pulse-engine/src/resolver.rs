//! Per-control implementation status.
//!
//! Resolution is a pure function of one control (with its subcontrols and
//! reviews), the evidence collection, and the evidence override mapping. It
//! never reads ambient state, so resolving controls in any order, any number
//! of times, yields the same results.
//!
//! Rules:
//!
//! - **With subcontrols.** Each subcontrol is *implemented* if any of its
//!   effective reviews is `Accepted`, *in progress* if any is
//!   `Pending Updates` or `Rejected`, otherwise *not started*. The control is
//!   `Implemented` when every subcontrol is implemented, `InProgress` when at
//!   least one is implemented or in progress, otherwise `NotStarted`.
//! - **Without subcontrols.** Control-scoped reviews decide: any `Accepted`
//!   → `Implemented`; else any `Pending Updates` → `InProgress`; else
//!   `NotStarted`. A control with no control-scoped reviews at all is
//!   `InProgress`.

use std::collections::{HashMap, HashSet};

use pulse_core::entities::{AuditorReview, Control, Evidence};
use pulse_core::enums::{ControlStatus, ReviewStatus};
use pulse_core::overrides::EvidenceOverrides;
use serde::Serialize;

/// Resolution result for one subcontrol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSubcontrol {
    pub subcontrol_id: String,
    pub status: ControlStatus,
    pub linked_evidence: usize,
}

/// Resolution result for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedControl {
    pub control_id: String,
    pub status: ControlStatus,
    pub subcontrols: Vec<ResolvedSubcontrol>,
    /// Distinct evidence items linked to the control or any subcontrol.
    pub linked_evidence: usize,
}

/// Lookup tables over an evidence collection, built once per aggregation.
#[derive(Debug, Default)]
pub struct EvidenceIndex<'a> {
    all: &'a [Evidence],
    by_subcontrol: HashMap<&'a str, Vec<usize>>,
    by_clause: HashMap<&'a str, Vec<usize>>,
}

impl<'a> EvidenceIndex<'a> {
    #[must_use]
    pub fn new(evidence: &'a [Evidence]) -> Self {
        let mut by_subcontrol: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_clause: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, item) in evidence.iter().enumerate() {
            if let Some(sub) = item.subcontrol_id.as_deref() {
                by_subcontrol.entry(sub).or_default().push(idx);
            }
            for clause in &item.control_ids {
                let slots = by_clause.entry(clause.as_str()).or_default();
                if slots.last() != Some(&idx) {
                    slots.push(idx);
                }
            }
        }
        Self {
            all: evidence,
            by_subcontrol,
            by_clause,
        }
    }

    /// Evidence linked to `subcontrol_id` through any path, in collection
    /// order, each item at most once.
    ///
    /// Paths: direct subcontrol reference, clause membership, or an override
    /// entry under the owning control's project and id.
    #[must_use]
    pub fn linked_to_subcontrol(
        &self,
        control: &Control,
        subcontrol_id: &str,
        overrides: &EvidenceOverrides,
    ) -> Vec<&'a Evidence> {
        let mut slots: Vec<usize> = Vec::new();
        slots.extend(self.by_subcontrol.get(subcontrol_id).into_iter().flatten());
        slots.extend(self.by_clause.get(subcontrol_id).into_iter().flatten());

        if !overrides.is_empty() {
            let project_id = control.project_id.as_deref().unwrap_or_default();
            slots.extend(self.all.iter().enumerate().filter_map(|(idx, item)| {
                overrides
                    .links(project_id, &control.id, &item.id, subcontrol_id)
                    .then_some(idx)
            }));
        }

        slots.sort_unstable();
        slots.dedup();
        slots.into_iter().map(|idx| &self.all[idx]).collect()
    }

    /// Evidence naming the control itself in its clause set.
    #[must_use]
    pub fn linked_to_control(&self, control_id: &str) -> Vec<&'a Evidence> {
        self.by_clause
            .get(control_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.all[idx])
            .collect()
    }
}

/// Reviews that decide a subcontrol's status.
///
/// Reviews scoped to the subcontrol win. When there are none, the control's
/// own reviews stand in, but only if the subcontrol has at least one linked
/// evidence item: an auditor who signed off the control is taken to have
/// reviewed the evidence filed under it.
#[must_use]
pub fn effective_reviews<'c>(
    control: &'c Control,
    subcontrol_id: &str,
    has_linked_evidence: bool,
) -> Vec<&'c AuditorReview> {
    let direct: Vec<&AuditorReview> = control.subcontrol_reviews(subcontrol_id).collect();
    if !direct.is_empty() {
        return direct;
    }
    if !has_linked_evidence {
        return Vec::new();
    }
    control.control_reviews().collect()
}

/// Status of a subcontrol from its effective reviews.
#[must_use]
pub fn subcontrol_status(reviews: &[&AuditorReview]) -> ControlStatus {
    if reviews.iter().any(|r| r.status == ReviewStatus::Accepted) {
        ControlStatus::Implemented
    } else if reviews.iter().any(|r| r.status.is_in_progress()) {
        ControlStatus::InProgress
    } else {
        ControlStatus::NotStarted
    }
}

/// Roll subcontrol statuses up to the control.
#[must_use]
pub fn rollup(statuses: &[ControlStatus]) -> ControlStatus {
    if !statuses.is_empty() && statuses.iter().all(|s| *s == ControlStatus::Implemented) {
        ControlStatus::Implemented
    } else if statuses.iter().any(|s| *s != ControlStatus::NotStarted) {
        ControlStatus::InProgress
    } else {
        ControlStatus::NotStarted
    }
}

/// Status of a control without subcontrols from its control-scoped reviews.
#[must_use]
pub fn direct_status(control: &Control) -> ControlStatus {
    let reviews: Vec<&AuditorReview> = control.control_reviews().collect();
    if reviews.is_empty() {
        return ControlStatus::InProgress;
    }
    if reviews.iter().any(|r| r.status == ReviewStatus::Accepted) {
        ControlStatus::Implemented
    } else if reviews.iter().any(|r| r.status == ReviewStatus::PendingUpdates) {
        ControlStatus::InProgress
    } else {
        ControlStatus::NotStarted
    }
}

/// Resolve one control and its subcontrols.
#[must_use]
pub fn resolve_control(
    control: &Control,
    index: &EvidenceIndex<'_>,
    overrides: &EvidenceOverrides,
) -> ResolvedControl {
    let mut linked_ids: HashSet<&str> = index
        .linked_to_control(&control.id)
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();

    if control.subcontrols.is_empty() {
        return ResolvedControl {
            control_id: control.id.clone(),
            status: direct_status(control),
            subcontrols: Vec::new(),
            linked_evidence: linked_ids.len(),
        };
    }

    let subcontrols: Vec<ResolvedSubcontrol> = control
        .subcontrols
        .iter()
        .map(|sub| {
            let linked = index.linked_to_subcontrol(control, &sub.id, overrides);
            let reviews = effective_reviews(control, &sub.id, !linked.is_empty());
            let resolved = ResolvedSubcontrol {
                subcontrol_id: sub.id.clone(),
                status: subcontrol_status(&reviews),
                linked_evidence: linked.len(),
            };
            linked_ids.extend(linked.into_iter().map(|e| e.id.as_str()));
            resolved
        })
        .collect();

    let statuses: Vec<ControlStatus> = subcontrols.iter().map(|s| s.status).collect();
    ResolvedControl {
        control_id: control.id.clone(),
        status: rollup(&statuses),
        subcontrols,
        linked_evidence: linked_ids.len(),
    }
}
