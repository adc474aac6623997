//! The process-wide store: live tracking plus persisted history.
//!
//! [`RunStore`] is the single writer for everything the surrounding
//! application reads. It is an owned value rather than a global, so tests
//! (and embedders) construct as many as they like over any
//! [`KeyValueStore`].
//!
//! Lifecycle:
//! 1. `open` hydrates history, achievements and goals from the backend
//!    (seeding defaults when nothing was stored, or when the stored document
//!    is unreadable and has been moved aside)
//! 2. lifecycle and ingestion calls mutate live state in memory
//! 3. every change to history, achievements or goals is flushed immediately
//!
//! A failed flush never rolls back the in-memory change. The store stays
//! dirty, the error is returned to the caller, and the next persisted
//! mutation or an explicit [`RunStore::flush`] writes the whole document again.

use log::{info, warn};

use crate::achievements::{default_achievements, met_milestones};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TrackerError};
use crate::persistence::{KeyValueStore, PersistedState, PersistedView};
use crate::{
    Achievement, Activity, ActivityHistory, ActivityKind, GeoSample, Goals, IngestOutcome,
    LifetimeTotals, LiveSnapshot, MilestoneRule, RunTracker, StartOutcome, TrackerConfig,
    TrackerState, WeeklySummary,
};

/// GPS quality advisory shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalStatus {
    #[default]
    Good,
    /// Last fix was too inaccurate, or the feed reported an error
    Weak,
}

/// Single-writer owner of live tracking state and persisted history.
pub struct RunStore<S: KeyValueStore> {
    tracker: RunTracker,
    history: ActivityHistory,
    achievements: Vec<Achievement>,
    goals: Goals,
    signal: SignalStatus,
    last_milestones: Vec<MilestoneRule>,
    dirty: bool,
    write_protected: bool,
    hydration_error: Option<String>,
    backend: S,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStore> std::fmt::Debug for RunStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStore")
            .field("state", &self.tracker.state())
            .field("tracking", &self.tracker.state().is_active())
            .field("activity_id", &self.tracker.activity_id())
            .field("history", &self.history.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<S: KeyValueStore> RunStore<S> {
    /// Hydrate a store with default configuration and the system clock.
    pub fn open(backend: S) -> Self {
        Self::open_with(backend, TrackerConfig::default(), SystemClock)
    }

    /// Hydrate a store with custom configuration and clock.
    ///
    /// Never fails. A document that cannot be read or decoded is moved aside
    /// via [`KeyValueStore::set_aside`] and the store starts from seeded
    /// defaults; [`hydration_error`](Self::hydration_error) reports what
    /// happened. If the document cannot even be moved, writes are held back
    /// (see [`is_write_protected`](Self::is_write_protected)) until a later
    /// flush manages to move it.
    pub fn open_with(mut backend: S, config: TrackerConfig, clock: impl Clock + 'static) -> Self {
        let key = config.storage_key.clone();
        let mut hydration_error = None;
        let mut write_protected = false;

        let persisted = match PersistedState::load_from(&backend, &key) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("[RunStore] Could not hydrate '{}', starting fresh: {}", key, e);
                hydration_error = Some(e.to_string());
                match backend.set_aside(&key, &clock.now_ms().to_string()) {
                    Ok(aside) => info!("[RunStore] Kept unreadable document at {}", aside),
                    Err(e) => {
                        warn!("[RunStore] Could not move '{}' aside, holding writes: {}", key, e);
                        write_protected = true;
                    }
                }
                None
            }
        };

        let (history, achievements, goals) = match persisted {
            Some(state) => (state.history, state.achievements, state.goals),
            None => (
                ActivityHistory::new(),
                default_achievements(clock.now_ms()),
                Goals::default(),
            ),
        };

        info!(
            "[RunStore] Hydrated: {} activities, {} achievements, goal {:.1} km / {} runs",
            history.len(),
            achievements.len(),
            goals.weekly_distance_km,
            goals.weekly_runs
        );

        Self {
            tracker: RunTracker::with_config(config),
            history,
            achievements,
            goals,
            signal: SignalStatus::Good,
            last_milestones: Vec::new(),
            dirty: false,
            write_protected,
            hydration_error,
            backend,
            clock: Box::new(clock),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start tracking an outdoor run. See [`RunTracker::start_with_kind`].
    pub fn start(&mut self) -> Result<StartOutcome> {
        self.start_with_kind(ActivityKind::OutdoorRun)
    }

    /// Start tracking an activity of the given kind.
    pub fn start_with_kind(&mut self, kind: ActivityKind) -> Result<StartOutcome> {
        let outcome = self.tracker.start_with_kind(kind, self.clock.now_ms())?;
        self.signal = SignalStatus::Good;
        Ok(outcome)
    }

    pub fn pause(&mut self) -> bool {
        self.tracker.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.tracker.resume()
    }

    /// Finalize the current activity into history.
    ///
    /// `Ok(None)` when idle (history untouched). If persisting fails the
    /// activity is already at the front of [`history`](Self::history) and the
    /// store is left dirty for a later retry.
    pub fn stop(&mut self) -> Result<Option<Activity>> {
        let Some(activity) = self.tracker.stop(self.clock.now_ms()) else {
            return Ok(None);
        };

        self.history.prepend(activity.clone());
        self.signal = SignalStatus::Good;
        self.last_milestones = met_milestones(&self.history);
        self.persist()?;
        Ok(Some(activity))
    }

    /// Abandon the current activity without adding it to history.
    pub fn discard(&mut self) -> Option<Activity> {
        let discarded = self.tracker.discard(self.clock.now_ms());
        if discarded.is_some() {
            self.signal = SignalStatus::Good;
        }
        discarded
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Fold a GPS fix into the live snapshot and update the signal advisory.
    pub fn ingest(&mut self, sample: GeoSample) -> Result<IngestOutcome> {
        let outcome = self.tracker.ingest(sample)?;
        match outcome {
            IngestOutcome::WeakSignal { .. } => self.signal = SignalStatus::Weak,
            IngestOutcome::NotRunning => {}
            _ => self.signal = SignalStatus::Good,
        }
        Ok(outcome)
    }

    /// Count one elapsed second.
    pub fn tick(&mut self) -> bool {
        self.tracker.tick()
    }

    /// Record an error from the GPS feed (signal loss, permission, timeout).
    ///
    /// Tracking continues; only the advisory changes.
    pub fn report_feed_error(&mut self, message: &str) {
        warn!("[RunStore] GPS feed error: {}", message);
        self.signal = SignalStatus::Weak;
    }

    // ========================================================================
    // History and settings
    // ========================================================================

    /// Remove an activity from history. Returns whether one was removed.
    pub fn delete_activity(&mut self, id: &str) -> Result<bool> {
        if self.history.remove(id).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Replace the weekly goals.
    pub fn set_goals(&mut self, goals: Goals) -> Result<()> {
        goals.validate()?;
        self.goals = goals;
        self.persist()
    }

    /// Write history, achievements and goals if a previous write failed.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if self.write_protected {
            self.release_protected_document()?;
        }
        let view = PersistedView {
            history: &self.history,
            achievements: &self.achievements,
            goals: &self.goals,
        };
        match view.save_to(&mut self.backend, &self.tracker.config().storage_key) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("[RunStore] Persist failed, will retry: {}", e);
                Err(e)
            }
        }
    }

    /// Retry moving an unreadable document aside so writes can resume.
    fn release_protected_document(&mut self) -> Result<()> {
        let key = self.tracker.config().storage_key.clone();
        match self.backend.set_aside(&key, &self.clock.now_ms().to_string()) {
            Ok(aside) => {
                info!("[RunStore] Kept unreadable document at {}, writes resumed", aside);
                self.write_protected = false;
                Ok(())
            }
            Err(e) => {
                warn!("[RunStore] Still holding writes for '{}': {}", key, e);
                Err(TrackerError::ProtectedDocument { key })
            }
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.dirty = true;
        self.flush()
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.tracker.activity_id()
    }

    /// Live metrics of the activity in progress (zeroed when idle).
    pub fn current_stats(&self) -> &LiveSnapshot {
        self.tracker.snapshot()
    }

    pub fn history(&self) -> &ActivityHistory {
        &self.history
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn goals(&self) -> &Goals {
        &self.goals
    }

    pub fn signal_status(&self) -> SignalStatus {
        self.signal
    }

    /// Milestones met as of the last `stop`. Reported only, never unlocked.
    pub fn milestones(&self) -> &[MilestoneRule] {
        &self.last_milestones
    }

    /// True while some persisted change has not reached the backend.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Why the stored document could not be loaded at open, if it could not.
    pub fn hydration_error(&self) -> Option<&str> {
        self.hydration_error.as_deref()
    }

    /// True while an unreadable document could not be moved aside and writes
    /// are held back to leave it untouched.
    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    pub fn weekly_summary(&self) -> WeeklySummary {
        self.history.weekly_summary(&self.goals, self.clock.now_ms())
    }

    pub fn lifetime_totals(&self) -> LifetimeTotals {
        self.history.lifetime_totals()
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryStore, RestartPolicy, TrackerError};
    use std::sync::Arc;

    /// Backend that fails every write while `failing` is set, and every read
    /// while `unreadable` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: bool,
        unreadable: bool,
        writes: usize,
    }

    fn unavailable(key: &str) -> TrackerError {
        TrackerError::Storage {
            key: key.to_string(),
            source: std::io::Error::other("disk unavailable"),
        }
    }

    impl KeyValueStore for FlakyStore {
        fn load(&self, key: &str) -> Result<Option<String>> {
            if self.unreadable {
                return Err(unavailable(key));
            }
            self.inner.load(key)
        }

        fn save(&mut self, key: &str, value: &str) -> Result<()> {
            if self.failing {
                return Err(unavailable(key));
            }
            self.writes += 1;
            self.inner.save(key, value)
        }

        fn set_aside(&mut self, key: &str, suffix: &str) -> Result<String> {
            if self.failing {
                return Err(unavailable(key));
            }
            self.inner.set_aside(key, suffix)
        }
    }

    fn store_at(now_ms: i64) -> (RunStore<MemoryStore>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now_ms));
        let store =
            RunStore::open_with(MemoryStore::new(), TrackerConfig::default(), clock.clone());
        (store, clock)
    }

    fn fix(lat: f64) -> GeoSample {
        GeoSample::new(lat, -118.0, 0, 5.0)
    }

    #[test]
    fn test_fresh_store_is_seeded() {
        let (store, _) = store_at(1_000);
        assert!(store.history().is_empty());
        assert_eq!(store.goals(), &Goals::default());
        assert_eq!(store.achievements().len(), 1);
        assert_eq!(store.achievements()[0].unlocked_at_ms, 1_000);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_stop_when_idle_leaves_history() {
        let (mut store, _) = store_at(0);
        assert!(store.stop().unwrap().is_none());
        assert!(store.history().is_empty());
        assert!(store.backend().get("stride-storage").is_none());
    }

    #[test]
    fn test_stop_uses_clock() {
        let (mut store, clock) = store_at(1_000_000);
        store.start().unwrap();
        for _ in 0..90 {
            store.tick();
        }
        clock.advance_secs(90);

        let activity = store.stop().unwrap().unwrap();
        assert_eq!(activity.ended_at_ms, 1_090_000);
        assert_eq!(activity.started_at_ms, 1_000_000);
        assert_eq!(store.state(), TrackerState::Idle);
        assert!(store.backend().get("stride-storage").is_some());
    }

    #[test]
    fn test_signal_status() {
        let (mut store, _) = store_at(0);
        store.start().unwrap();

        let mut weak = fix(34.0);
        weak.horizontal_accuracy_m = 30.0;
        store.ingest(weak).unwrap();
        assert_eq!(store.signal_status(), SignalStatus::Weak);
        assert!(store.current_stats().last_admitted.is_none());

        store.ingest(fix(34.0)).unwrap();
        assert_eq!(store.signal_status(), SignalStatus::Good);

        store.report_feed_error("timeout");
        assert_eq!(store.signal_status(), SignalStatus::Weak);
        assert_eq!(store.state(), TrackerState::Running);
    }

    #[test]
    fn test_invalid_coordinate_is_surfaced() {
        let (mut store, _) = store_at(0);
        store.start().unwrap();
        let err = store.ingest(fix(-95.0)).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidCoordinate { .. }));
        assert!(store.current_stats().trace.is_empty());
    }

    #[test]
    fn test_delete_activity() {
        let (mut store, _) = store_at(0);
        store.start().unwrap();
        let id = store.stop().unwrap().unwrap().id;

        assert!(!store.delete_activity("nope").unwrap());
        assert!(store.delete_activity(&id).unwrap());
        assert!(store.history().is_empty());

        let persisted = PersistedState::load_from(store.backend(), "stride-storage")
            .unwrap()
            .unwrap();
        assert!(persisted.history.is_empty());
    }

    #[test]
    fn test_set_goals() {
        let (mut store, _) = store_at(0);
        let goals = Goals {
            weekly_distance_km: 20.0,
            weekly_runs: 2,
        };
        store.set_goals(goals).unwrap();
        assert_eq!(store.goals(), &goals);

        let bad = Goals {
            weekly_distance_km: -1.0,
            weekly_runs: 2,
        };
        assert!(matches!(store.set_goals(bad), Err(TrackerError::InvalidGoal(_))));
        assert_eq!(store.goals(), &goals);
    }

    #[test]
    fn test_persist_failure_keeps_memory_state_and_retries() {
        let mut store = RunStore::open(FlakyStore::default());
        store.backend_mut().failing = true;

        store.start().unwrap();
        store.tick();
        let err = store.stop().unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(store.history().len(), 1);
        assert!(store.is_dirty());

        // Tracking keeps working while the backend is down
        store.start().unwrap();
        assert!(store.tick());

        store.backend_mut().failing = false;
        store.flush().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.backend().writes, 1);

        let persisted = PersistedState::load_from(store.backend(), "stride-storage")
            .unwrap()
            .unwrap();
        assert_eq!(persisted.history.len(), 1);
    }

    #[test]
    fn test_reject_policy_through_store() {
        let config = TrackerConfig {
            restart_policy: RestartPolicy::Reject,
            ..TrackerConfig::default()
        };
        let mut store = RunStore::open_with(MemoryStore::new(), config, FixedClock::new(0));
        store.start().unwrap();
        assert!(store.start().is_err());

        let discarded = store.discard().unwrap();
        assert_eq!(discarded.status, crate::ActivityStatus::Discarded);
        assert!(store.history().is_empty());
        assert!(store.start().is_ok());
    }

    #[test]
    fn test_milestones_reported_after_stop() {
        let (mut store, _) = store_at(0);
        for _ in 0..5 {
            store.start().unwrap();
            store.stop().unwrap();
        }
        assert_eq!(store.milestones(), &[MilestoneRule::FiveRuns]);
        // Reported, never unlocked
        assert_eq!(store.achievements().len(), 1);
    }

    #[test]
    fn test_corrupt_document_is_set_aside_and_tracking_continues() {
        let mut backend = MemoryStore::new();
        backend.save("stride-storage", "{\"history\": [").unwrap();

        let mut store =
            RunStore::open_with(backend, TrackerConfig::default(), FixedClock::new(5_000));

        assert!(store.hydration_error().is_some());
        assert!(!store.is_write_protected());
        assert_eq!(store.backend().get("stride-storage.corrupt-5000"), Some("{\"history\": ["));
        assert!(store.history().is_empty());
        assert_eq!(store.achievements().len(), 1);

        store.start().unwrap();
        assert!(store.ingest(fix(34.0)).unwrap().is_admitted());
        assert!(store.tick());
        store.stop().unwrap();

        let persisted = PersistedState::load_from(store.backend(), "stride-storage")
            .unwrap()
            .unwrap();
        assert_eq!(persisted.history.len(), 1);
    }

    #[test]
    fn test_unmovable_document_holds_writes_until_released() {
        let mut inner = MemoryStore::new();
        inner.save("stride-storage", "{ broken").unwrap();
        let backend = FlakyStore {
            inner,
            failing: true,
            unreadable: true,
            writes: 0,
        };

        let mut store = RunStore::open(backend);
        assert!(store.hydration_error().is_some());
        assert!(store.is_write_protected());

        // Live tracking is unaffected
        store.start().unwrap();
        assert!(store.tick());
        let err = store.stop().unwrap_err();
        assert!(matches!(err, TrackerError::ProtectedDocument { .. }));
        assert_eq!(store.history().len(), 1);
        assert!(store.is_dirty());
        assert_eq!(store.backend().inner.get("stride-storage"), Some("{ broken"));

        store.backend_mut().failing = false;
        store.backend_mut().unreadable = false;
        store.flush().unwrap();

        assert!(!store.is_write_protected());
        assert!(!store.is_dirty());
        assert_eq!(store.backend().writes, 1);
        let persisted = PersistedState::load_from(store.backend(), "stride-storage")
            .unwrap()
            .unwrap();
        assert_eq!(persisted.history.len(), 1);
    }
}
