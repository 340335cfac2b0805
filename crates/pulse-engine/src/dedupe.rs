//! Control deduplication.
//!
//! Per-project fetches overlap: a control reachable from several projects
//! (e.g., through a shared framework) comes back once per project. Counting
//! must see each control id once.

use std::collections::HashSet;

use pulse_core::entities::Control;

/// Keep the first occurrence of each control id, preserving order.
#[must_use]
pub fn dedupe_controls(controls: &[Control]) -> Vec<&Control> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(controls.len());
    let unique: Vec<&Control> = controls
        .iter()
        .filter(|c| seen.insert(c.id.as_str()))
        .collect();

    let dropped = controls.len() - unique.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = unique.len(), "deduplicated shared controls");
    }
    unique
}
