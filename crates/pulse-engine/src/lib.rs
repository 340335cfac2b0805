//! # pulse-engine
//!
//! Aggregation and caching engine behind the organization snapshot.
//!
//! Data flow:
//!
//! ```text
//! FetchOrchestrator → RawCollections → dedupe → resolver (per control)
//!     → metrics::aggregate → SnapshotCache → SnapshotStore → consumers
//! ```
//!
//! - [`orchestrator`]: two-level parallel fetch (independent collections,
//!   then project-scoped controls/evidence, then per-control reviews)
//! - [`resolver`]: pure per-control status resolution
//! - [`dedupe`]: one canonical control per id
//! - [`metrics`]: breakdowns, weighted scores, framework compliance
//! - [`cache`]: size-fingerprint memoization with a TTL
//! - [`store`]: the public read surface and command set

pub mod cache;
pub mod collections;
pub mod dedupe;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod phase;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{EngineError, FetchError, MetricsError};
pub use store::{Recompute, SnapshotStore, StoreStats, StoreView};
