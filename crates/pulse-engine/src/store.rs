//! The snapshot store: raw collections in, organization snapshot out.
//!
//! `SnapshotStore` is a cheap-to-clone handle over shared state. Fetch
//! results are applied per resource; whenever an application changes the
//! collection fingerprint, a debounced recompute is (re)scheduled on the
//! tokio runtime. Only the last change inside the debounce window triggers
//! a recompute.
//!
//! ```text
//! fetch_all ─▶ apply batch ─▶ fingerprint changed? ─▶ schedule(debounce)
//!                                                         │ (aborts previous)
//!                                                         ▼
//!                           recompute ◀── sleep(debounce) ─┘
//!                               │ calculating guard held
//!                               ▼
//!                 SnapshotCache::get_or_compute ─▶ aggregate
//! ```
//!
//! Locks are never held across an `.await`. The debounce task only holds a
//! [`Weak`] reference, so dropping the last handle (or calling
//! [`SnapshotStore::dispose`]) leaves nothing running.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use pulse_api::{ApiError, ComplianceApi, HttpComplianceApi};
use pulse_config::PulseConfig;
use pulse_core::entities::{Auditor, Control, Evidence, Framework, Project, Risk, Todo, User};
use pulse_core::enums::Resource;
use pulse_core::overrides::EvidenceOverrides;
use pulse_core::snapshot::OrganizationSnapshot;
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::cache::{Fingerprint, Lookup, SizeFingerprint, SnapshotCache};
use crate::collections::RawCollections;
use crate::error::{EngineError, FetchError, MetricsError};
use crate::metrics::{ActivitySettings, aggregate};
use crate::orchestrator::{DependentBatch, FetchOrchestrator, IndependentBatch};
use crate::phase::{Phase, PhaseSlot};

/// Read-only copy of everything the store exposes.
#[derive(Debug, Clone, Serialize)]
pub struct StoreView {
    pub organization_snapshot: Option<OrganizationSnapshot>,
    pub projects: Vec<Project>,
    pub risks: Vec<Risk>,
    pub controls: Vec<Control>,
    pub evidence: Vec<Evidence>,
    pub users: Vec<User>,
    pub auditors: Vec<Auditor>,
    pub todos: Vec<Todo>,
    pub frameworks: Vec<Framework>,
    pub loading_by_resource: BTreeMap<Resource, bool>,
    pub errors_by_resource: BTreeMap<Resource, String>,
    pub is_loading: bool,
    pub has_errors: bool,
    pub is_data_stale: bool,
}

/// How a recompute request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// The aggregator ran and the result was cached.
    Computed,
    /// A cached snapshot for the current fingerprint was reused.
    CacheHit,
    /// Another recompute held the calculating guard.
    Skipped,
}

/// Counters for recompute outcomes since the store was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub computations: u64,
    pub cache_hits: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy)]
struct StoreSettings {
    ttl: TimeDelta,
    debounce: Duration,
    activity: ActivitySettings,
}

impl StoreSettings {
    fn from_config(config: &PulseConfig) -> Self {
        Self {
            ttl: TimeDelta::from_std(config.cache.ttl()).unwrap_or(TimeDelta::MAX),
            debounce: config.engine.debounce(),
            activity: ActivitySettings::from_config(&config.engine),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    raw: RawCollections,
    loading: BTreeMap<Resource, bool>,
    errors: BTreeMap<Resource, String>,
    snapshot: Option<OrganizationSnapshot>,
    last_updated: Option<DateTime<Utc>>,
    /// Fingerprint of the collections when a recompute was last scheduled.
    observed_key: Option<String>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            raw: RawCollections::default(),
            loading: Resource::ALL.into_iter().map(|r| (r, false)).collect(),
            errors: BTreeMap::new(),
            snapshot: None,
            last_updated: None,
            observed_key: None,
        }
    }

    fn set_loading(&mut self, resource: Resource, loading: bool) {
        self.loading.insert(resource, loading);
    }

    fn is_loading(&self) -> bool {
        self.loading.values().any(|&loading| loading)
    }

    /// Replace one collection on success, record the error otherwise. The
    /// previous records survive a failed fetch.
    fn apply<T>(&mut self, resource: Resource, result: Result<Vec<T>, ApiError>, slot: fn(&mut RawCollections) -> &mut Vec<T>) {
        match result {
            Ok(records) => {
                *slot(&mut self.raw) = records;
                self.errors.remove(&resource);
            }
            Err(e) => {
                self.errors.insert(resource, e.to_string());
            }
        }
        self.set_loading(resource, false);
    }
}

struct StoreInner {
    orchestrator: FetchOrchestrator,
    settings: StoreSettings,
    fingerprint: Box<dyn Fingerprint>,
    state: Mutex<StoreState>,
    cache: Mutex<SnapshotCache>,
    calculating: PhaseSlot,
    pending: Mutex<Option<AbortHandle>>,
    disposed: AtomicBool,
    computations: AtomicU64,
    cache_hits: AtomicU64,
    skipped: AtomicU64,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, SnapshotCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_pending(&self) {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }

    fn recompute(&self) -> Result<Recompute, MetricsError> {
        let Some(_guard) = self.calculating.try_enter() else {
            tracing::debug!("recompute already running; skipped");
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(Recompute::Skipped);
        };

        let raw = self.state().raw.clone();
        let key = self.fingerprint.key(&raw);
        let now = Utc::now();
        let result = self
            .cache()
            .get_or_compute(&key, now, || aggregate(&raw, &self.settings.activity, now));

        match result {
            Ok((snapshot, lookup)) => {
                let outcome = match lookup {
                    Lookup::Hit => {
                        self.cache_hits.fetch_add(1, Ordering::Relaxed);
                        Recompute::CacheHit
                    }
                    Lookup::Computed => {
                        self.computations.fetch_add(1, Ordering::Relaxed);
                        Recompute::Computed
                    }
                };
                tracing::debug!(%key, ?outcome, compliance = snapshot.scores.compliance, "snapshot updated");
                let mut state = self.state();
                state.last_updated = Some(snapshot.last_updated);
                state.snapshot = Some(snapshot);
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(%e, %key, "snapshot recompute failed; keeping previous snapshot");
                Err(e)
            }
        }
    }

    fn apply_independent(self: &Arc<Self>, batch: IndependentBatch) {
        {
            let mut state = self.state();
            state.apply(Resource::Projects, batch.projects, |raw| &mut raw.projects);
            state.apply(Resource::Risks, batch.risks, |raw| &mut raw.risks);
            state.apply(Resource::Users, batch.users, |raw| &mut raw.users);
            state.apply(Resource::Auditors, batch.auditors, |raw| &mut raw.auditors);
            state.apply(Resource::Todos, batch.todos, |raw| &mut raw.todos);
            state.apply(Resource::Frameworks, batch.frameworks, |raw| &mut raw.frameworks);
        }
        self.schedule_if_changed();
    }

    fn apply_dependent(self: &Arc<Self>, batch: DependentBatch) {
        {
            let mut state = self.state();
            state.apply(Resource::Controls, Ok(batch.controls), |raw| &mut raw.controls);
            state.apply(Resource::Evidence, Ok(batch.evidence), |raw| &mut raw.evidence);
        }
        self.schedule_if_changed();
    }

    fn schedule_if_changed(self: &Arc<Self>) {
        let changed = {
            let mut state = self.state();
            let key = self.fingerprint.key(&state.raw);
            if state.observed_key.as_deref() == Some(key.as_str()) {
                false
            } else {
                state.observed_key = Some(key);
                true
            }
        };
        if changed {
            self.schedule_recompute();
        }
    }

    /// Start the debounce timer, aborting the previous one.
    fn schedule_recompute(self: &Arc<Self>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let delay = self.settings.debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                // Errors are logged inside; the previous snapshot stays.
                let _ = inner.recompute();
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::trace!(?delay, "recompute scheduled");
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Clears every loading flag when a fetch pass ends, however it ends.
struct LoadingReset(Weak<StoreInner>);

impl Drop for LoadingReset {
    fn drop(&mut self) {
        if let Some(inner) = self.0.upgrade() {
            let mut state = inner.state();
            for resource in Resource::ALL {
                state.set_loading(resource, false);
            }
        }
    }
}

/// Shared handle to one organization snapshot store.
///
/// Clones share state. Independent stores can coexist, each with its own API
/// client, cache, and guards.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("settings", &self.inner.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Store over `api`, using the size fingerprint for cache keys.
    #[must_use]
    pub fn new(api: Arc<dyn ComplianceApi>, config: &PulseConfig) -> Self {
        Self::with_fingerprint(api, config, SizeFingerprint)
    }

    #[must_use]
    pub fn with_fingerprint(
        api: Arc<dyn ComplianceApi>,
        config: &PulseConfig,
        fingerprint: impl Fingerprint + 'static,
    ) -> Self {
        let settings = StoreSettings::from_config(config);
        Self {
            inner: Arc::new(StoreInner {
                orchestrator: FetchOrchestrator::new(api),
                settings,
                fingerprint: Box::new(fingerprint),
                state: Mutex::new(StoreState::new()),
                cache: Mutex::new(SnapshotCache::new(config.cache.ttl())),
                calculating: PhaseSlot::new(Phase::Calculating),
                pending: Mutex::new(None),
                disposed: AtomicBool::new(false),
                computations: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
        }
    }

    /// Store over the HTTP API described by `config.api`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API section is not configured or the HTTP
    /// client cannot be built.
    pub fn connect(config: &PulseConfig) -> Result<Self, EngineError> {
        let api = HttpComplianceApi::from_config(config.require_api()?)?;
        tracing::info!(base_url = %config.api.base_url, "snapshot store connected");
        Ok(Self::new(Arc::new(api), config))
    }

    // -- reads --

    #[must_use]
    pub fn view(&self) -> StoreView {
        let state = self.inner.state();
        let raw = &state.raw;
        StoreView {
            organization_snapshot: state.snapshot.clone(),
            projects: raw.projects.clone(),
            risks: raw.risks.clone(),
            controls: raw.controls.clone(),
            evidence: raw.evidence.clone(),
            users: raw.users.clone(),
            auditors: raw.auditors.clone(),
            todos: raw.todos.clone(),
            frameworks: raw.frameworks.clone(),
            loading_by_resource: state.loading.clone(),
            errors_by_resource: state.errors.clone(),
            is_loading: state.is_loading(),
            has_errors: !state.errors.is_empty(),
            is_data_stale: self.stale_at(state.last_updated, Utc::now()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<OrganizationSnapshot> {
        self.inner.state().snapshot.clone()
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.state().last_updated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state().is_loading()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.inner.state().errors.is_empty()
    }

    /// True when no snapshot was ever computed or the last one is older than
    /// the cache TTL.
    #[must_use]
    pub fn is_data_stale(&self) -> bool {
        let last_updated = self.inner.state().last_updated;
        self.stale_at(last_updated, Utc::now())
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            computations: self.inner.computations.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            skipped: self.inner.skipped.load(Ordering::Relaxed),
        }
    }

    fn stale_at(&self, last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_updated.is_none_or(|at| now - at > self.inner.settings.ttl)
    }

    // -- commands --

    /// Fetch every collection and apply the results as they arrive.
    ///
    /// Resource failures land in the error slots; nothing is returned for
    /// them. Dropping the returned future does not cancel the pass.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AlreadyInFlight`] while another fetch runs, or
    /// [`FetchError::Task`] if the pass task panicked.
    pub async fn fetch_all(&self) -> Result<(), FetchError> {
        let Some(pass) = self.inner.orchestrator.try_begin() else {
            tracing::debug!("fetch already in flight; ignoring request");
            return Err(FetchError::AlreadyInFlight);
        };

        {
            let mut state = self.inner.state();
            for resource in Resource::ALL {
                state.set_loading(resource, true);
            }
        }
        let loading = LoadingReset(Arc::downgrade(&self.inner));
        let weak = Arc::downgrade(&self.inner);

        // The pass runs on its own task: a caller that stops waiting does not
        // cancel the requests, and the results still land in the store.
        let task = tokio::spawn(async move {
            let _loading = loading;
            let independent = pass.fetch_independent().await;
            let Some(inner) = weak.upgrade() else {
                tracing::debug!("store dropped; fetch results ignored");
                return;
            };
            inner.apply_independent(independent);
            // Falls back to the projects already held if the projects request failed.
            let project_ids = inner.state().raw.project_ids();
            drop(inner);

            let dependent = pass.fetch_dependent(&project_ids).await;
            let Some(inner) = weak.upgrade() else {
                tracing::debug!("store dropped; fetch results ignored");
                return;
            };
            inner.apply_dependent(dependent);
            tracing::info!(
                projects = project_ids.len(),
                errors = inner.state().errors.len(),
                "fetch completed"
            );
        });

        task.await.map_err(|e| {
            tracing::warn!(%e, "fetch task failed");
            FetchError::Task(e.to_string())
        })
    }

    /// Drop cached snapshots, fetch everything, and recompute even if the
    /// collection sizes did not change.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AlreadyInFlight`] while another fetch runs.
    pub async fn refresh_all(&self) -> Result<(), FetchError> {
        self.inner.cache().clear();
        self.fetch_all().await?;
        self.inner.schedule_recompute();
        Ok(())
    }

    pub fn clear_errors(&self) {
        self.inner.state().errors.clear();
    }

    /// Drop collections, snapshot, cache, and any pending recompute.
    /// Evidence overrides are kept. A fetch already in flight is not
    /// interrupted and will apply its results when it completes.
    pub fn reset_state(&self) {
        self.inner.cancel_pending();
        self.inner.cache().clear();
        let mut state = self.inner.state();
        state.raw.clear_records();
        state.errors.clear();
        for resource in Resource::ALL {
            state.set_loading(resource, false);
        }
        state.snapshot = None;
        state.last_updated = None;
        state.observed_key = None;
        tracing::debug!("store state reset");
    }

    /// Replace the evidence override mapping.
    ///
    /// Overrides do not change the size fingerprint, so cached snapshots are
    /// dropped. The next recompute (debounced or via
    /// [`Self::recalculate_now`]) picks the new mapping up.
    pub fn set_evidence_overrides(&self, overrides: EvidenceOverrides) {
        self.inner.cache().clear();
        self.inner.state().raw.overrides = overrides;
    }

    /// Recompute immediately, cancelling any pending debounced recompute.
    ///
    /// # Errors
    ///
    /// Returns the aggregation error; the previous snapshot is kept.
    pub fn recalculate_now(&self) -> Result<Recompute, MetricsError> {
        self.inner.cancel_pending();
        self.inner.recompute()
    }

    /// Cancel any pending recompute and stop scheduling new ones.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        self.inner.cancel_pending();
        tracing::debug!("snapshot store disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockApi, MockData, control, evidence, project, review, risk, subcontrol};
    use pretty_assertions::assert_eq;
    use pulse_core::enums::{ControlStatus, EvidenceStatus, ReviewStatus, RiskLevel};
    use std::collections::HashMap;

    const SETTLE: Duration = Duration::from_millis(400);

    fn fixture() -> MockData {
        MockData {
            projects: vec![project("prj-1")],
            risks: vec![risk("rsk-1", RiskLevel::Low), risk("rsk-2", RiskLevel::High)],
            controls_by_project: HashMap::from([(
                "prj-1".to_string(),
                vec![control("ctl-1"), control("ctl-2")],
            )]),
            evidence_by_project: HashMap::from([(
                "prj-1".to_string(),
                vec![evidence("evd-1", EvidenceStatus::Collected)],
            )]),
            reviews_by_control: HashMap::from([(
                "ctl-1".to_string(),
                vec![review("rev-1", None, ReviewStatus::Accepted)],
            )]),
            ..MockData::default()
        }
    }

    fn store(data: MockData) -> (Arc<MockApi>, SnapshotStore) {
        let api = Arc::new(MockApi::new(data));
        let store = SnapshotStore::new(api.clone(), &PulseConfig::default());
        (api, store)
    }

    #[tokio::test(start_paused = true)]
    async fn recompute_runs_after_debounce() {
        let (_, store) = store(fixture());
        store.fetch_all().await.unwrap();

        assert!(store.snapshot().is_none());
        assert!(store.is_data_stale());

        tokio::time::sleep(SETTLE).await;
        let snapshot = store.snapshot().expect("snapshot after debounce");
        assert_eq!(snapshot.totals.projects, 1);
        assert_eq!(snapshot.totals.controls, 2);
        assert_eq!(snapshot.breakdowns.controls.implemented, 1);
        assert_eq!(store.last_updated(), Some(snapshot.last_updated));
        assert!(!store.is_data_stale());
        assert_eq!(store.stats().computations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_inside_window_are_coalesced() {
        let (api, store) = store(fixture());
        store.fetch_all().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        api.update(|d| d.risks.push(risk("rsk-3", RiskLevel::Critical)));
        store.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;

        assert_eq!(store.stats().computations, 1);
        assert_eq!(store.snapshot().unwrap().totals.risks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_sizes_do_not_recompute() {
        let (_, store) = store(fixture());
        store.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;

        store.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;

        assert_eq!(store.stats(), StoreStats {
            computations: 1,
            cache_hits: 0,
            skipped: 0,
        });
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_all_recomputes_with_fresh_cache() {
        let (api, store) = store(fixture());
        store.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;
        assert_eq!(store.snapshot().unwrap().breakdowns.controls.implemented, 1);

        // same sizes, different content
        api.update(|d| {
            d.reviews_by_control
                .insert("ctl-2".into(), vec![review("rev-2", None, ReviewStatus::Accepted)]);
        });
        store.refresh_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;

        assert_eq!(store.stats().computations, 2);
        assert_eq!(store.snapshot().unwrap().breakdowns.controls.implemented, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetch_is_rejected() {
        let mut data = fixture();
        data.projects_delay = Some(Duration::from_secs(1));
        let (_, store) = store(data);

        let running = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_all().await })
        };
        tokio::task::yield_now().await;

        assert!(store.is_loading());
        assert!(matches!(store.fetch_all().await, Err(FetchError::AlreadyInFlight)));

        running.await.unwrap().unwrap();
        assert!(!store.is_loading());
        assert!(store.fetch_all().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_still_lands_and_clears_loading() {
        let mut data = fixture();
        data.projects_delay = Some(Duration::from_secs(1));
        let (_, store) = store(data);

        let caller = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_all().await })
        };
        tokio::task::yield_now().await;
        assert!(store.is_loading());
        caller.abort();

        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = store.view();
        assert!(!view.is_loading);
        assert_eq!(view.projects.len(), 1);
        assert_eq!(view.controls.len(), 2);
        assert!(view.organization_snapshot.is_some());
        assert!(store.fetch_all().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_resource_keeps_previous_records() {
        let (api, store) = store(fixture());
        store.fetch_all().await.unwrap();

        api.update(|d| {
            d.failing.insert("risks".into());
            d.risks.clear();
        });
        store.fetch_all().await.unwrap();

        let view = store.view();
        assert_eq!(view.risks.len(), 2);
        assert!(view.has_errors);
        assert!(view.errors_by_resource[&Resource::Risks].contains("risks unavailable"));
        assert!(!view.errors_by_resource.contains_key(&Resource::Projects));
        assert!(!view.is_loading);
        assert!(view.loading_by_resource.values().all(|&loading| !loading));

        store.clear_errors();
        assert!(!store.has_errors());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_projects_reuse_held_project_ids() {
        let (api, store) = store(fixture());
        store.fetch_all().await.unwrap();

        api.update(|d| {
            d.failing.insert("projects".into());
            d.controls_by_project
                .get_mut("prj-1")
                .unwrap()
                .push(control("ctl-3"));
        });
        store.fetch_all().await.unwrap();

        let view = store.view();
        assert_eq!(view.projects.len(), 1);
        assert_eq!(view.controls.len(), 3);
        assert!(view.errors_by_resource.contains_key(&Resource::Projects));
    }

    #[tokio::test(start_paused = true)]
    async fn recalculate_now_bypasses_debounce() {
        let (_, store) = store(fixture());
        store.fetch_all().await.unwrap();

        assert_eq!(store.recalculate_now().unwrap(), Recompute::Computed);
        assert!(store.snapshot().is_some());
        assert_eq!(store.recalculate_now().unwrap(), Recompute::CacheHit);

        // the debounced task was cancelled
        tokio::time::sleep(SETTLE).await;
        assert_eq!(store.stats(), StoreStats {
            computations: 1,
            cache_hits: 1,
            skipped: 0,
        });
    }

    #[tokio::test]
    async fn recompute_skipped_while_calculating() {
        let (_, store) = store(fixture());
        let _guard = store.inner.calculating.try_enter().unwrap();

        assert_eq!(store.recalculate_now().unwrap(), Recompute::Skipped);
        assert!(store.snapshot().is_none());
        assert_eq!(store.stats().skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overrides_invalidate_cached_snapshot() {
        let mut sub_control = control("ctl-1");
        sub_control.subcontrols = vec![subcontrol("sub-1")];
        let data = MockData {
            projects: vec![project("prj-1")],
            controls_by_project: HashMap::from([("prj-1".to_string(), vec![sub_control])]),
            evidence_by_project: HashMap::from([(
                "prj-1".to_string(),
                vec![evidence("evd-1", EvidenceStatus::Collected)],
            )]),
            reviews_by_control: HashMap::from([(
                "ctl-1".to_string(),
                vec![review("rev-1", None, ReviewStatus::Accepted)],
            )]),
            ..MockData::default()
        };
        let (_, store) = store(data);
        store.fetch_all().await.unwrap();
        store.recalculate_now().unwrap();
        assert_eq!(
            store.snapshot().unwrap().control_statuses["ctl-1"],
            ControlStatus::NotStarted
        );

        let mut overrides = EvidenceOverrides::new();
        overrides.insert("prj-1", "ctl-1", "evd-1", "sub-1");
        store.set_evidence_overrides(overrides);

        assert_eq!(store.recalculate_now().unwrap(), Recompute::Computed);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.control_statuses["ctl-1"], ControlStatus::Implemented);
        assert_eq!(snapshot.controls_with_evidence, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_state_clears_everything_but_overrides() {
        let (_, store) = store(fixture());
        let mut overrides = EvidenceOverrides::new();
        overrides.insert("prj-1", "ctl-1", "evd-1", "sub-1");
        store.set_evidence_overrides(overrides);
        store.fetch_all().await.unwrap();
        store.recalculate_now().unwrap();

        store.reset_state();
        let view = store.view();
        assert!(view.organization_snapshot.is_none());
        assert!(view.projects.is_empty());
        assert!(view.controls.is_empty());
        assert!(view.is_data_stale);
        assert_eq!(store.inner.state().raw.overrides.len(), 1);

        // a fetch after reset schedules a fresh recompute
        store.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;
        assert!(store.snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_recompute() {
        let (_, store) = store(fixture());
        store.fetch_all().await.unwrap();
        store.dispose();

        tokio::time::sleep(SETTLE).await;
        assert!(store.snapshot().is_none());
        assert_eq!(store.stats().computations, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_last_handle_leaves_nothing_running() {
        let (api, store) = store(fixture());
        store.fetch_all().await.unwrap();
        let weak = Arc::downgrade(&store.inner);
        drop(store);

        tokio::time::sleep(SETTLE).await;
        assert!(weak.upgrade().is_none());
        // nothing re-fetched after the drop
        assert_eq!(api.calls(), 6 + 2 + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stores_are_independent() {
        let (_, first) = store(fixture());
        let (_, second) = store(MockData::default());
        first.fetch_all().await.unwrap();
        second.fetch_all().await.unwrap();
        tokio::time::sleep(SETTLE).await;

        assert_eq!(first.snapshot().unwrap().totals.projects, 1);
        assert_eq!(second.snapshot().unwrap().totals.projects, 0);
    }
}
