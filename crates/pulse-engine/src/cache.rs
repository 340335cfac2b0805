//! Snapshot memoization keyed by a collection fingerprint.
//!
//! The default [`SizeFingerprint`] only looks at collection lengths, so two
//! different datasets of equal sizes share a key. That trade-off is accepted:
//! a review flipping from `Pending Updates` to `Accepted` is picked up once
//! the entry ages out or the cache is cleared. A stronger strategy can be
//! plugged in through the [`Fingerprint`] trait without touching the rest of
//! the pipeline.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use pulse_core::snapshot::OrganizationSnapshot;

use crate::collections::RawCollections;

/// Derives the cache key for a set of raw collections.
pub trait Fingerprint: Send + Sync {
    fn key(&self, raw: &RawCollections) -> String;
}

/// Key built from the lengths of projects, risks, controls, evidence, users,
/// auditors, and todos.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeFingerprint;

impl Fingerprint for SizeFingerprint {
    fn key(&self, raw: &RawCollections) -> String {
        let s = raw.sizes();
        format!(
            "p{}-r{}-c{}-e{}-u{}-a{}-t{}",
            s.projects, s.risks, s.controls, s.evidence, s.users, s.auditors, s.todos
        )
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub snapshot: OrganizationSnapshot,
    pub stored_at: DateTime<Utc>,
}

/// In-memory snapshot cache with a fixed time-to-live.
#[derive(Debug)]
pub struct SnapshotCache {
    ttl: TimeDelta,
    entries: HashMap<String, CacheEntry>,
}

/// Whether a lookup was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Computed,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entries: HashMap::new(),
        }
    }

    /// Cached snapshot for `key` if it is younger than the TTL at `now`.
    /// Expired entries are evicted.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<&OrganizationSnapshot> {
        let fresh = self
            .entries
            .get(key)
            .is_some_and(|entry| now - entry.stored_at < self.ttl);
        if !fresh {
            if self.entries.remove(key).is_some() {
                tracing::debug!(key, "snapshot cache entry expired");
            }
            return None;
        }
        self.entries.get(key).map(|entry| &entry.snapshot)
    }

    /// Store `snapshot` under `key`. Entries that have expired by `now` are
    /// dropped first, so only live fingerprints are retained.
    pub fn put(&mut self, key: impl Into<String>, snapshot: OrganizationSnapshot, now: DateTime<Utc>) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        if self.entries.len() < before {
            tracing::debug!(evicted = before - self.entries.len(), "expired snapshot cache entries dropped");
        }
        let key = key.into();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                snapshot,
                stored_at: now,
            },
        );
    }

    /// Serve `key` from the cache, or run `compute` and store its result.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored.
    pub fn get_or_compute<E>(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
        compute: impl FnOnce() -> Result<OrganizationSnapshot, E>,
    ) -> Result<(OrganizationSnapshot, Lookup), E> {
        if let Some(snapshot) = self.get(key, now) {
            tracing::debug!(key, "snapshot cache hit");
            return Ok((snapshot.clone(), Lookup::Hit));
        }
        let snapshot = compute()?;
        self.put(key, snapshot.clone(), now);
        Ok((snapshot, Lookup::Computed))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
