//! Activity lifecycle state machine.
//!
//! ```text
//!   Idle --start--> Running --pause--> Paused
//!    ^                 ^  <--resume--    |
//!    |                 |                 |
//!    +----stop/discard-+-----------------+
//! ```
//!
//! `stop` finalizes the live snapshot into an [`Activity`] and returns to
//! `Idle` in the same call, so the terminal "stopped" state is never
//! observable. Every fix and tick is checked against the current state
//! before it touches the snapshot, which is what makes events that were
//! already in flight when the user paused harmless.

use log::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::finalize::finalize;
use crate::{
    Activity, ActivityKind, ActivityStatus, GeoSample, IngestOutcome, LiveSnapshot, RestartPolicy,
    TrackerConfig,
};

/// Lifecycle state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TrackerState {
    /// True while an activity id is assigned (running or paused).
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Result of a successful `start`.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A new activity began from idle.
    Started { activity_id: String },
    /// An in-progress activity was thrown away (not archived) and a new one began.
    Restarted {
        activity_id: String,
        discarded: Activity,
    },
}

impl StartOutcome {
    pub fn activity_id(&self) -> &str {
        match self {
            Self::Started { activity_id } | Self::Restarted { activity_id, .. } => activity_id,
        }
    }
}

/// Owns the live snapshot and the start/pause/resume/stop transitions.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    state: TrackerState,
    activity_id: Option<String>,
    kind: ActivityKind,
    snapshot: LiveSnapshot,
    config: TrackerConfig,
}

impl RunTracker {
    /// Create an idle tracker with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle tracker with custom configuration.
    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn activity_id(&self) -> Option<&str> {
        self.activity_id.as_deref()
    }

    pub fn snapshot(&self) -> &LiveSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Begin tracking an outdoor run.
    pub fn start(&mut self, now_ms: i64) -> Result<StartOutcome> {
        self.start_with_kind(ActivityKind::OutdoorRun, now_ms)
    }

    /// Begin tracking an activity of the given kind.
    ///
    /// If an activity is already in progress the [`RestartPolicy`] decides:
    /// either it is discarded without archival and handed back in
    /// [`StartOutcome::Restarted`], or the call fails with
    /// [`TrackerError::ActivityInProgress`] and nothing changes.
    pub fn start_with_kind(&mut self, kind: ActivityKind, now_ms: i64) -> Result<StartOutcome> {
        let discarded = match self.activity_id.clone() {
            Some(activity_id) if self.config.restart_policy == RestartPolicy::Reject => {
                return Err(TrackerError::ActivityInProgress { activity_id });
            }
            Some(_) => self.discard(now_ms),
            None => None,
        };

        let activity_id = Uuid::new_v4().to_string();
        self.activity_id = Some(activity_id.clone());
        self.kind = kind;
        self.snapshot = LiveSnapshot::new();
        self.state = TrackerState::Running;

        info!("[RunTracker] Started {} ({})", activity_id, kind.label());

        Ok(match discarded {
            Some(discarded) => StartOutcome::Restarted {
                activity_id,
                discarded,
            },
            None => StartOutcome::Started { activity_id },
        })
    }

    /// Suspend ingestion. Returns false if not running (idempotent).
    pub fn pause(&mut self) -> bool {
        if self.state != TrackerState::Running {
            return false;
        }
        self.state = TrackerState::Paused;
        info!(
            "[RunTracker] Paused at {}s / {:.3} km",
            self.snapshot.elapsed_seconds, self.snapshot.distance_km
        );
        true
    }

    /// Resume ingestion. Returns false if not paused.
    pub fn resume(&mut self) -> bool {
        if self.state != TrackerState::Paused {
            return false;
        }
        self.state = TrackerState::Running;
        info!("[RunTracker] Resumed");
        true
    }

    /// Finalize the current activity and return to idle.
    ///
    /// Returns `None` (and does nothing) when no activity is active.
    pub fn stop(&mut self, now_ms: i64) -> Option<Activity> {
        let id = self.activity_id.take()?;
        let activity = finalize(&self.snapshot, &id, self.kind, now_ms, self.config.kcal_per_km);
        self.reset();

        info!(
            "[RunTracker] Stopped {}: {:.3} km in {}s",
            activity.id, activity.distance_km, activity.duration_seconds
        );
        Some(activity)
    }

    /// Abandon the current activity without archival and return to idle.
    ///
    /// The abandoned activity is returned with `Discarded` status so the
    /// caller can still show or log it.
    pub fn discard(&mut self, now_ms: i64) -> Option<Activity> {
        let id = self.activity_id.take()?;
        let mut activity = finalize(&self.snapshot, &id, self.kind, now_ms, self.config.kcal_per_km);
        activity.status = ActivityStatus::Discarded;
        self.reset();

        info!("[RunTracker] Discarded {}", activity.id);
        Some(activity)
    }

    fn reset(&mut self) {
        self.state = TrackerState::Idle;
        self.activity_id = None;
        self.snapshot = LiveSnapshot::new();
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Fold a GPS fix into the live snapshot if the tracker is running.
    pub fn ingest(&mut self, sample: GeoSample) -> Result<IngestOutcome> {
        if self.state != TrackerState::Running {
            debug!("[RunTracker] Dropping fix while {:?}", self.state);
            return Ok(IngestOutcome::NotRunning);
        }
        self.snapshot.fold_sample(sample, &self.config)
    }

    /// Count one elapsed second. Returns false (no effect) unless running.
    pub fn tick(&mut self) -> bool {
        if self.state != TrackerState::Running {
            return false;
        }
        self.snapshot.advance_second();
        true
    }
}
