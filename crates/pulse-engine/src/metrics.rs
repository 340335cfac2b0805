//! Metrics aggregation: breakdowns, weighted scores, framework compliance.
//!
//! [`aggregate`] is the whole pipeline from raw collections to a snapshot:
//! deduplicate controls, resolve each one, then roll everything up.
//!
//! Formulas (rates are percentages, scores are rounded):
//!
//! ```text
//! control_implementation_rate = implemented / total_controls * 100      (0 if no controls)
//! evidence_collection_rate    = collected_evidence / total_controls * 100 (0 if no controls)
//! security    = round(cir * 0.7 + ecr * 0.3)
//! risk_mgmt   = (low*100 + medium*75 + high*50 + critical*25) / total_risks (100 if no risks)
//! privacy     = round(risk_mgmt)
//! project_completion_rate = completed / total_projects * 100           (0 if no projects)
//! regulatory  = round(pcr * 0.5 + cir * 0.5)
//! compliance  = round(security * 0.4 + privacy * 0.35 + regulatory * 0.25)
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use pulse_config::EngineConfig;
use pulse_core::entities::{Control, Framework, Project, Risk};
use pulse_core::enums::{ControlStatus, EvidenceStatus, ProjectStatus, RiskLevel, TodoStatus, UserStatus};
use pulse_core::snapshot::{
    ActivityItem, ActivityKind, ControlBreakdown, EvidenceBreakdown, FrameworkCompliance,
    OrganizationSnapshot, ProjectBreakdown, RiskBreakdown, Scores, StatusBreakdowns,
    TodoBreakdown, Totals, UserBreakdown,
};

use crate::collections::RawCollections;
use crate::dedupe::dedupe_controls;
use crate::error::MetricsError;
use crate::resolver::{EvidenceIndex, resolve_control};

/// Recent-activity window and cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySettings {
    pub window: TimeDelta,
    pub limit: usize,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ActivitySettings {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            window: TimeDelta::days(i64::from(config.activity_window_days)),
            limit: usize::try_from(config.activity_limit).unwrap_or(usize::MAX),
        }
    }
}

/// Counts the weighted scores are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreInputs {
    pub implemented_controls: u32,
    pub total_controls: u32,
    pub collected_evidence: u32,
    pub risks: RiskBreakdown,
    pub completed_projects: u32,
    pub total_projects: u32,
}

/// Run the full pipeline over `raw` and build a snapshot stamped `now`.
///
/// # Errors
///
/// Returns [`MetricsError::NonFinite`] if any rate or score cannot be
/// represented as a non-negative integer percentage.
pub fn aggregate(
    raw: &RawCollections,
    activity: &ActivitySettings,
    now: DateTime<Utc>,
) -> Result<OrganizationSnapshot, MetricsError> {
    let controls = dedupe_controls(&raw.controls);
    let index = EvidenceIndex::new(&raw.evidence);

    let mut control_breakdown = ControlBreakdown::default();
    let mut control_statuses = BTreeMap::new();
    let mut controls_with_evidence = 0u32;
    for control in &controls {
        let resolved = resolve_control(control, &index, &raw.overrides);
        control_breakdown.record(resolved.status);
        if resolved.linked_evidence > 0 {
            controls_with_evidence += 1;
        }
        control_statuses.insert(resolved.control_id, resolved.status);
    }

    let breakdowns = StatusBreakdowns {
        projects: project_breakdown(&raw.projects),
        risks: risk_breakdown(&raw.risks),
        controls: control_breakdown,
        evidence: evidence_breakdown(raw.evidence.iter().map(|e| e.status)),
        users: user_breakdown(raw.users.iter().map(|u| u.status)),
        todos: todo_breakdown(raw.todos.iter().map(|t| t.status)),
    };

    let scores = compute_scores(&ScoreInputs {
        implemented_controls: control_breakdown.implemented,
        total_controls: count(controls.len()),
        collected_evidence: breakdowns.evidence.collected,
        risks: breakdowns.risks,
        completed_projects: breakdowns.projects.completed,
        total_projects: count(raw.projects.len()),
    })?;

    let framework_compliance = framework_compliance(&raw.frameworks, &controls, &control_statuses)?;

    Ok(OrganizationSnapshot {
        totals: Totals {
            projects: count(raw.projects.len()),
            risks: count(raw.risks.len()),
            controls: count(controls.len()),
            evidence: count(raw.evidence.len()),
            users: count(raw.users.len()),
            auditors: count(raw.auditors.len()),
            todos: count(raw.todos.len()),
            frameworks: count(raw.frameworks.len()),
        },
        breakdowns,
        scores,
        framework_compliance,
        recent_activity: recent_activity(&raw.projects, &raw.risks, activity, now),
        controls_with_evidence,
        control_statuses,
        last_updated: now,
    })
}

/// Compute every rate and weighted score.
///
/// # Errors
///
/// Returns [`MetricsError::NonFinite`] if a score is NaN, infinite, or negative.
pub fn compute_scores(inputs: &ScoreInputs) -> Result<Scores, MetricsError> {
    let control_implementation_rate = percent(inputs.implemented_controls, inputs.total_controls);
    let evidence_collection_rate = percent(inputs.collected_evidence, inputs.total_controls);
    let security = round_metric(
        "security",
        control_implementation_rate * 0.7 + evidence_collection_rate * 0.3,
    )?;

    let risk_management_score = risk_management_score(&inputs.risks);
    let privacy = round_metric("privacy", risk_management_score)?;

    let project_completion_rate = percent(inputs.completed_projects, inputs.total_projects);
    let regulatory = round_metric(
        "regulatory",
        project_completion_rate * 0.5 + control_implementation_rate * 0.5,
    )?;

    Ok(Scores {
        security,
        privacy,
        regulatory,
        compliance: weighted_compliance(security, privacy, regulatory)?,
        control_implementation_rate,
        evidence_collection_rate,
        project_completion_rate,
        risk_management_score,
    })
}

/// Overall compliance from the three component scores.
///
/// # Errors
///
/// Returns [`MetricsError::NonFinite`] only if the weighted sum is not finite,
/// which cannot happen for `u32` inputs; the signature mirrors the other scores.
pub fn weighted_compliance(security: u32, privacy: u32, regulatory: u32) -> Result<u32, MetricsError> {
    round_metric(
        "compliance",
        f64::from(security) * 0.4 + f64::from(privacy) * 0.35 + f64::from(regulatory) * 0.25,
    )
}

/// Average risk weight, 100 when no risks are registered.
#[must_use]
pub fn risk_management_score(risks: &RiskBreakdown) -> f64 {
    let total = risks.total();
    if total == 0 {
        return 100.0;
    }
    let weighted = [
        (risks.low, RiskLevel::Low),
        (risks.medium, RiskLevel::Medium),
        (risks.high, RiskLevel::High),
        (risks.critical, RiskLevel::Critical),
    ]
    .into_iter()
    .map(|(n, level)| f64::from(n) * f64::from(level.score_weight()))
    .sum::<f64>();
    weighted / f64::from(total)
}

/// Compliance per framework.
///
/// Known frameworks come first in their listed order (0% when they have no
/// controls); framework ids referenced only by controls follow, sorted by id
/// and named by id. Controls without a framework are not grouped.
///
/// # Errors
///
/// Returns [`MetricsError::NonFinite`] if a percentage cannot be rounded.
pub fn framework_compliance(
    frameworks: &[Framework],
    controls: &[&Control],
    statuses: &BTreeMap<String, ControlStatus>,
) -> Result<Vec<FrameworkCompliance>, MetricsError> {
    let mut groups: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for control in controls {
        let Some(framework_id) = control.framework_id.as_deref() else {
            continue;
        };
        let entry = groups.entry(framework_id).or_default();
        entry.0 += 1;
        if statuses.get(&control.id) == Some(&ControlStatus::Implemented) {
            entry.1 += 1;
        }
    }

    let entry = |id: &str, name: &str, (total, implemented): (u32, u32)| -> Result<FrameworkCompliance, MetricsError> {
        Ok(FrameworkCompliance {
            framework_id: id.to_string(),
            name: name.to_string(),
            total_controls: total,
            implemented_controls: implemented,
            compliance_percentage: round_metric("framework_compliance", percent(implemented, total))?,
        })
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(frameworks.len() + groups.len());
    for framework in frameworks {
        if !seen.insert(framework.id.as_str()) {
            continue;
        }
        let counts = groups.remove(framework.id.as_str()).unwrap_or_default();
        out.push(entry(&framework.id, &framework.name, counts)?);
    }
    for (id, counts) in groups {
        out.push(entry(id, id, counts)?);
    }
    Ok(out)
}

/// Projects and risks created within the activity window, newest first.
///
/// Timestamps after `now` (clock skew upstream) are not activity yet and are
/// left out.
#[must_use]
pub fn recent_activity(
    projects: &[Project],
    risks: &[Risk],
    settings: &ActivitySettings,
    now: DateTime<Utc>,
) -> Vec<ActivityItem> {
    let cutoff = now - settings.window;
    let in_window = |t: &DateTime<Utc>| *t >= cutoff && *t <= now;
    let from_projects = projects.iter().filter_map(|p| {
        p.created_at.filter(in_window).map(|created_at| ActivityItem {
            kind: ActivityKind::Project,
            id: p.id.clone(),
            title: p.name.clone(),
            created_at,
        })
    });
    let from_risks = risks.iter().filter_map(|r| {
        r.created_at.filter(in_window).map(|created_at| ActivityItem {
            kind: ActivityKind::Risk,
            id: r.id.clone(),
            title: r.title.clone(),
            created_at,
        })
    });

    let mut items: Vec<ActivityItem> = from_projects.chain(from_risks).collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    items.truncate(settings.limit);
    items
}

fn project_breakdown(projects: &[Project]) -> ProjectBreakdown {
    let mut breakdown = ProjectBreakdown::default();
    for project in projects {
        match project.status {
            ProjectStatus::Completed => breakdown.completed += 1,
            ProjectStatus::InProgress => breakdown.in_progress += 1,
            ProjectStatus::NotStarted => breakdown.not_started += 1,
            ProjectStatus::Unknown => {}
        }
    }
    breakdown
}

fn risk_breakdown(risks: &[Risk]) -> RiskBreakdown {
    let mut breakdown = RiskBreakdown::default();
    for risk in risks {
        match risk.level {
            RiskLevel::Low => breakdown.low += 1,
            RiskLevel::Medium => breakdown.medium += 1,
            RiskLevel::High => breakdown.high += 1,
            RiskLevel::Critical => breakdown.critical += 1,
            RiskLevel::Unknown => {}
        }
    }
    breakdown
}

fn evidence_breakdown(statuses: impl Iterator<Item = EvidenceStatus>) -> EvidenceBreakdown {
    let mut breakdown = EvidenceBreakdown::default();
    for status in statuses {
        match status {
            EvidenceStatus::Collected => breakdown.collected += 1,
            EvidenceStatus::Pending => breakdown.pending += 1,
            EvidenceStatus::Missing => breakdown.missing += 1,
        }
    }
    breakdown
}

fn user_breakdown(statuses: impl Iterator<Item = UserStatus>) -> UserBreakdown {
    let mut breakdown = UserBreakdown::default();
    for status in statuses {
        match status {
            UserStatus::Active => breakdown.active += 1,
            UserStatus::PendingApproval => breakdown.pending_approval += 1,
            UserStatus::Inactive => breakdown.inactive += 1,
        }
    }
    breakdown
}

fn todo_breakdown(statuses: impl Iterator<Item = TodoStatus>) -> TodoBreakdown {
    let mut breakdown = TodoBreakdown::default();
    for status in statuses {
        match status {
            TodoStatus::Pending => breakdown.pending += 1,
            TodoStatus::Approved => breakdown.approved += 1,
            TodoStatus::Rejected => breakdown.rejected += 1,
            TodoStatus::Completed => breakdown.completed += 1,
        }
    }
    breakdown
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(whole) * 100.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_metric(metric: &'static str, value: f64) -> Result<u32, MetricsError> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(MetricsError::NonFinite { metric, value });
    }
    Ok(value.round() as u32)
}
