//! # Stride Engine
//!
//! Live run tracking: turns a noisy stream of GPS fixes and a one-second
//! tick into distance, pace and duration, and archives finished runs into a
//! persisted history.
//!
//! This library provides:
//! - Accuracy and jitter filtering of raw GPS fixes
//! - Incremental haversine distance accumulation
//! - A start/pause/resume/stop lifecycle around a live snapshot
//! - Finalization of the snapshot into an immutable [`Activity`]
//! - A single-writer [`RunStore`] that hydrates from and flushes to a key-value store
//!
//! ## Features
//!
//! - **`feeds`** - Async driver that drains GPS/tick events from a bounded channel (tokio)
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use stride_engine::{GeoSample, MemoryStore, RunStore};
//!
//! let mut store = RunStore::open(MemoryStore::new());
//!
//! store.start().unwrap();
//! store.ingest(GeoSample::new(34.0, -118.0, 0, 5.0)).unwrap();
//! store.ingest(GeoSample::new(34.0001, -118.0, 1_000, 5.0)).unwrap();
//! for _ in 0..60 {
//!     store.tick();
//! }
//!
//! let run = store.stop().unwrap().expect("a run was active");
//! assert_eq!(run.duration_seconds, 60);
//! assert_eq!(run.route.len(), 2);
//! assert_eq!(store.history().len(), 1);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackerError};

// Great-circle distance
pub mod geo_utils;

// Live metrics and the per-fix filtering pipeline
pub mod snapshot;
pub use snapshot::{IngestOutcome, LiveSnapshot};

// Lifecycle state machine
pub mod tracker;
pub use tracker::{RunTracker, StartOutcome, TrackerState};

// Snapshot -> Activity
pub mod finalize;
pub use finalize::{energy_estimate_kcal, finalize};

// History, goals and summaries
pub mod history;
pub use history::{ActivityHistory, Goals, LifetimeTotals, WeeklySummary};

// Achievement records and milestone rules
pub mod achievements;
pub use achievements::{Achievement, AchievementTier, MilestoneRule};

// Key-value persistence contract
pub mod persistence;
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, PersistedState};

// Injectable wall clock
pub mod clock;
pub use clock::{Clock, FixedClock, SystemClock};

// Process-wide single-writer store
pub mod store;
pub use store::{RunStore, SignalStatus};

// Display helpers
pub mod format;
pub use format::{format_duration, format_pace};

// Async event driver
#[cfg(feature = "feeds")]
pub mod feed;
#[cfg(feature = "feeds")]
pub use feed::{spawn_ticker, EventDriver, TrackerEvent};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

#[cfg(feature = "ffi")]
pub mod ffi;

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("StrideEngine"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A single raw location fix from the device.
///
/// # Example
/// ```
/// use stride_engine::GeoSample;
/// let fix = GeoSample::new(34.0, -118.0, 1_700_000_000_000, 5.0).with_speed(3.2);
/// assert_eq!(fix.speed_mps, Some(3.2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Capture time, Unix epoch milliseconds
    pub timestamp_ms: i64,
    /// Uncertainty radius in meters
    pub horizontal_accuracy_m: f64,
    /// Instantaneous speed in m/s, if the receiver reported one
    #[serde(default)]
    pub speed_mps: Option<f64>,
}

impl GeoSample {
    /// Create a fix without speed information.
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64, horizontal_accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            horizontal_accuracy_m,
            speed_mps: None,
        }
    }

    /// Attach a receiver-reported speed.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Check if the fix has valid coordinates.
    pub fn is_valid(&self) -> bool {
        geo_utils::is_valid_coordinate(self.latitude, self.longitude)
    }
}

/// Kind of activity being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityKind {
    #[default]
    OutdoorRun,
    Treadmill,
    Trail,
}

impl ActivityKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OutdoorRun => "Outdoor Run",
            Self::Treadmill => "Treadmill",
            Self::Trail => "Trail Run",
        }
    }
}

/// Final status of an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityStatus {
    Completed,
    Discarded,
}

/// An immutable record of a finished (or abandoned) activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Assigned at start, stable across pause/resume
    pub id: String,
    pub kind: ActivityKind,
    /// Derived as `ended_at_ms - duration`, not the first fix time
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub duration_seconds: u32,
    pub distance_km: f64,
    pub average_pace_sec_per_km: f64,
    /// Placeholder estimate, a function of distance only
    pub energy_estimate_kcal: u32,
    /// Every admitted fix, in arrival order
    pub route: Vec<GeoSample>,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Activity {
    /// True if this record counts toward history totals.
    pub fn is_completed(&self) -> bool {
        self.status == ActivityStatus::Completed
    }
}

/// What `start()` does when an activity is already being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Throw away the in-progress activity without archiving it and start over.
    #[default]
    DiscardInProgress,
    /// Refuse with [`TrackerError::ActivityInProgress`]; the caller confirms by
    /// stopping or discarding first.
    Reject,
}

/// Configuration for the tracking pipeline.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Fixes with a larger uncertainty radius are dropped as weak signal.
    /// Default: 25.0 meters
    pub max_horizontal_accuracy_m: f64,

    /// Movement below this distance from the last admitted fix is jitter.
    /// Default: 0.005 km (5 meters)
    pub min_movement_km: f64,

    /// Energy placeholder multiplier.
    /// Default: 60.0 kcal per km
    pub kcal_per_km: f64,

    /// Behavior of `start()` while an activity is in progress.
    /// Default: discard the in-progress activity
    pub restart_policy: RestartPolicy,

    /// Key under which history, goals and achievements are persisted.
    /// Default: "stride-storage"
    pub storage_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy_m: 25.0,
            min_movement_km: 0.005,
            kcal_per_km: 60.0,
            restart_policy: RestartPolicy::DiscardInProgress,
            storage_key: "stride-storage".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_validation() {
        assert!(GeoSample::new(34.0, -118.0, 0, 5.0).is_valid());
        assert!(!GeoSample::new(91.0, 0.0, 0, 5.0).is_valid());
        assert!(!GeoSample::new(0.0, 181.0, 0, 5.0).is_valid());
        assert!(!GeoSample::new(f64::NAN, 0.0, 0, 5.0).is_valid());
    }

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.max_horizontal_accuracy_m, 25.0);
        assert_eq!(config.min_movement_km, 0.005);
        assert_eq!(config.restart_policy, RestartPolicy::DiscardInProgress);
    }

    #[test]
    fn test_sample_speed_is_optional_in_json() {
        let json = r#"{"latitude":1.0,"longitude":2.0,"timestamp_ms":3,"horizontal_accuracy_m":4.0}"#;
        let sample: GeoSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.speed_mps, None);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ActivityKind::default(), ActivityKind::OutdoorRun);
        assert_eq!(ActivityKind::Trail.label(), "Trail Run");
    }
}
