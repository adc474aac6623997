//! FFI bindings for mobile platforms (iOS/Android).
//!
//! The app holds exactly one store for its lifetime, so the bindings keep it
//! in a process-wide slot and expose plain free functions over primitives.
//! Compound results cross the boundary as JSON strings; an uninitialized
//! engine answers every call with `false`, an empty string or `"null"`.

use std::path::Path;
use std::sync::Mutex;

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::{init_logging, ActivityKind, GeoSample, Goals, JsonFileStore, RunStore};

static ENGINE: Lazy<Mutex<Option<RunStore<JsonFileStore>>>> = Lazy::new(|| Mutex::new(None));

/// Run `f` against the global store, or return `None` before `engine_init`.
fn with_engine<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut RunStore<JsonFileStore>) -> R,
{
    let mut guard = ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match guard.as_mut() {
        Some(store) => Some(f(store)),
        None => {
            warn!("[StrideEngine] Called before engine_init");
            None
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("[StrideEngine] JSON encoding failed: {}", e);
        "null".to_string()
    })
}

fn parse_kind(kind: &str) -> ActivityKind {
    match kind {
        "Treadmill" => ActivityKind::Treadmill,
        "Trail" => ActivityKind::Trail,
        _ => ActivityKind::OutdoorRun,
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Open (or reuse) the store persisted under `storage_dir`.
///
/// Always leaves a usable engine behind. If the stored document could not be
/// loaded, tracking still works from a fresh history and
/// `engine_get_hydration_error` says why.
#[uniffi::export]
pub fn engine_init(storage_dir: String) -> bool {
    init_logging();
    let mut guard = ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(store) = guard.as_ref() {
        if store.backend().dir() != Path::new(&storage_dir) {
            warn!(
                "[StrideEngine] Already initialized at {}, ignoring {}",
                store.backend().dir().display(),
                storage_dir
            );
        }
        return true;
    }

    let store = RunStore::open(JsonFileStore::new(&storage_dir));
    match store.hydration_error() {
        Some(e) => warn!("[StrideEngine] Initialized at {} with fresh history: {}", storage_dir, e),
        None => info!("[StrideEngine] Initialized at {}", storage_dir),
    }
    *guard = Some(store);
    true
}

/// Why the stored history could not be loaded at init, or "" if it was.
#[uniffi::export]
pub fn engine_get_hydration_error() -> String {
    with_engine(|e| e.hydration_error().unwrap_or_default().to_string()).unwrap_or_default()
}

#[uniffi::export]
pub fn engine_is_initialized() -> bool {
    ENGINE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .is_some()
}

/// Retry a failed write. True when nothing is left unsaved.
#[uniffi::export]
pub fn engine_flush() -> bool {
    with_engine(|e| e.flush().is_ok()).unwrap_or(false)
}

// ============================================================================
// Tracking
// ============================================================================

/// Start a run. Returns the new activity id, or an empty string if refused.
#[uniffi::export]
pub fn tracker_start(kind: String) -> String {
    with_engine(|e| match e.start_with_kind(parse_kind(&kind)) {
        Ok(outcome) => outcome.activity_id().to_string(),
        Err(err) => {
            warn!("[StrideEngine] Start refused: {}", err);
            String::new()
        }
    })
    .unwrap_or_default()
}

#[uniffi::export]
pub fn tracker_pause() -> bool {
    with_engine(|e| e.pause()).unwrap_or(false)
}

#[uniffi::export]
pub fn tracker_resume() -> bool {
    with_engine(|e| e.resume()).unwrap_or(false)
}

/// Stop and archive the run. Returns the activity as JSON, or "" when idle.
///
/// The activity is returned even if persisting it failed; call
/// `engine_flush` later to retry.
#[uniffi::export]
pub fn tracker_stop() -> String {
    with_engine(|e| {
        let pending = e.activity_id().map(str::to_string);
        match e.stop() {
            Ok(Some(activity)) => to_json(&activity),
            Ok(None) => String::new(),
            Err(err) => {
                warn!("[StrideEngine] Stop not persisted: {}", err);
                pending
                    .and_then(|id| e.history().get(&id).map(to_json))
                    .unwrap_or_default()
            }
        }
    })
    .unwrap_or_default()
}

/// Abandon the run without archiving it.
#[uniffi::export]
pub fn tracker_discard() -> bool {
    with_engine(|e| e.discard().is_some()).unwrap_or(false)
}

/// Feed one GPS fix. Returns true if it extended the route.
#[uniffi::export]
pub fn tracker_ingest(
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
    timestamp_ms: i64,
    speed_mps: Option<f64>,
) -> bool {
    let sample = GeoSample {
        latitude,
        longitude,
        timestamp_ms,
        horizontal_accuracy_m: accuracy_m,
        speed_mps,
    };
    with_engine(|e| match e.ingest(sample) {
        Ok(outcome) => outcome.is_admitted(),
        Err(err) => {
            warn!("[StrideEngine] Rejected fix: {}", err);
            false
        }
    })
    .unwrap_or(false)
}

#[uniffi::export]
pub fn tracker_report_feed_error(message: String) {
    with_engine(|e| e.report_feed_error(&message));
}

/// Count one elapsed second.
#[uniffi::export]
pub fn tracker_tick() -> bool {
    with_engine(|e| e.tick()).unwrap_or(false)
}

/// "Idle", "Running" or "Paused".
#[uniffi::export]
pub fn tracker_get_state() -> String {
    with_engine(|e| format!("{:?}", e.state())).unwrap_or_default()
}

/// True while an activity is running or paused.
#[uniffi::export]
pub fn tracker_is_active() -> bool {
    with_engine(|e| e.state().is_active()).unwrap_or(false)
}

#[uniffi::export]
pub fn tracker_signal_is_weak() -> bool {
    with_engine(|e| e.signal_status() == crate::SignalStatus::Weak).unwrap_or(false)
}

// ============================================================================
// Queries
// ============================================================================

#[uniffi::export]
pub fn engine_get_current_stats_json() -> String {
    with_engine(|e| to_json(e.current_stats())).unwrap_or_else(|| "null".to_string())
}

/// Activity history, newest first.
#[uniffi::export]
pub fn engine_get_history_json() -> String {
    with_engine(|e| to_json(e.history())).unwrap_or_else(|| "null".to_string())
}

/// The `count` most recent activities, newest first.
#[uniffi::export]
pub fn engine_get_recent_activities_json(count: u32) -> String {
    with_engine(|e| to_json(e.history().recent(count as usize))).unwrap_or_else(|| "null".to_string())
}

#[uniffi::export]
pub fn engine_get_achievements_json() -> String {
    with_engine(|e| to_json(e.achievements())).unwrap_or_else(|| "null".to_string())
}

#[uniffi::export]
pub fn engine_get_goals_json() -> String {
    with_engine(|e| to_json(e.goals())).unwrap_or_else(|| "null".to_string())
}

#[uniffi::export]
pub fn engine_get_weekly_summary_json() -> String {
    with_engine(|e| to_json(&e.weekly_summary())).unwrap_or_else(|| "null".to_string())
}

#[uniffi::export]
pub fn engine_get_lifetime_totals_json() -> String {
    with_engine(|e| to_json(&e.lifetime_totals())).unwrap_or_else(|| "null".to_string())
}

// ============================================================================
// Mutations
// ============================================================================

#[uniffi::export]
pub fn engine_delete_activity(activity_id: String) -> bool {
    with_engine(|e| match e.delete_activity(&activity_id) {
        Ok(removed) => removed,
        Err(err) => {
            warn!("[StrideEngine] Delete not persisted: {}", err);
            true
        }
    })
    .unwrap_or(false)
}

/// Replace the weekly goals. False if invalid or not persisted.
#[uniffi::export]
pub fn engine_set_goals(weekly_distance_km: f64, weekly_runs: u32) -> bool {
    let goals = Goals {
        weekly_distance_km,
        weekly_runs,
    };
    with_engine(|e| match e.set_goals(goals) {
        Ok(()) => true,
        Err(err) => {
            warn!("[StrideEngine] Goals not updated: {}", err);
            false
        }
    })
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test: the engine slot is process-wide.
    #[test]
    fn test_ffi_session() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!tracker_pause());
        assert_eq!(engine_get_history_json(), "null");

        // An unreadable document must not keep the engine from tracking
        std::fs::write(dir.path().join("stride-storage.json"), "{\"history\": [").unwrap();

        assert!(engine_init(dir.path().to_string_lossy().into_owned()));
        assert!(engine_is_initialized());
        assert!(!engine_get_hydration_error().is_empty());
        assert_eq!(engine_get_history_json(), "[]");
        assert_eq!(tracker_stop(), "");

        // A second init keeps the first store
        let other = tempfile::tempdir().unwrap();
        assert!(engine_init(other.path().to_string_lossy().into_owned()));
        assert!(!engine_get_hydration_error().is_empty());

        let id = tracker_start("Trail".to_string());
        assert!(!id.is_empty());
        assert_eq!(tracker_get_state(), "Running");
        assert!(tracker_is_active());

        assert!(tracker_ingest(34.0, -118.0, 5.0, 0, None));
        assert!(!tracker_ingest(34.0001, -118.0, 30.0, 1_000, None));
        assert!(tracker_signal_is_weak());
        assert!(tracker_ingest(34.0001, -118.0, 5.0, 2_000, Some(3.0)));
        assert!(tracker_tick());

        let stopped = tracker_stop();
        assert!(stopped.contains(&id));
        assert!(!tracker_is_active());
        assert!(engine_get_history_json().contains(&id));
        assert!(engine_get_recent_activities_json(1).contains(&id));
        assert_eq!(engine_get_recent_activities_json(0), "[]");
        assert!(dir.path().join("stride-storage.json").exists());
        let kept_aside = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().contains(".corrupt-"));
        assert!(kept_aside);

        assert!(!engine_set_goals(0.0, 3));
        assert!(engine_set_goals(30.0, 3));
        assert!(engine_get_goals_json().contains("30"));

        assert!(engine_delete_activity(id));
        assert_eq!(engine_get_history_json(), "[]");
        assert!(engine_flush());
    }
}
