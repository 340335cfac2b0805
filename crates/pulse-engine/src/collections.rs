//! Raw record collections as last fetched, and their size signature.

use pulse_core::entities::{
    Auditor, Control, Evidence, Framework, Project, Risk, Todo, User,
};
use pulse_core::overrides::EvidenceOverrides;
use serde::Serialize;

/// Every raw collection the snapshot is derived from.
///
/// Each field is replaced wholesale when its resource is re-fetched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawCollections {
    pub projects: Vec<Project>,
    pub risks: Vec<Risk>,
    pub controls: Vec<Control>,
    pub evidence: Vec<Evidence>,
    pub users: Vec<User>,
    pub auditors: Vec<Auditor>,
    pub todos: Vec<Todo>,
    pub frameworks: Vec<Framework>,
    pub overrides: EvidenceOverrides,
}

/// Lengths of the collections that drive recomputation and cache keys.
///
/// Frameworks are deliberately absent: they only label groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CollectionSizes {
    pub projects: usize,
    pub risks: usize,
    pub controls: usize,
    pub evidence: usize,
    pub users: usize,
    pub auditors: usize,
    pub todos: usize,
}

impl RawCollections {
    #[must_use]
    pub fn sizes(&self) -> CollectionSizes {
        CollectionSizes {
            projects: self.projects.len(),
            risks: self.risks.len(),
            controls: self.controls.len(),
            evidence: self.evidence.len(),
            users: self.users.len(),
            auditors: self.auditors.len(),
            todos: self.todos.len(),
        }
    }

    /// Project ids in collection order.
    #[must_use]
    pub fn project_ids(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.id.clone()).collect()
    }

    /// Drop every collection. Overrides are an input owned by the caller and
    /// survive.
    pub fn clear_records(&mut self) {
        let overrides = std::mem::take(&mut self.overrides);
        *self = Self {
            overrides,
            ..Self::default()
        };
    }
}
