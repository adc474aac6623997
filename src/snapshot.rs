//! Live metrics for the activity currently being tracked.
//!
//! A [`LiveSnapshot`] is folded forward one event at a time: GPS fixes via
//! [`LiveSnapshot::fold_sample`] and wall-clock seconds via
//! [`LiveSnapshot::advance_second`]. The lifecycle gate (is the tracker
//! running?) lives in [`crate::tracker`]; everything here assumes it passed.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{geo_utils, GeoSample, TrackerConfig};

/// What happened to a GPS fix handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// The tracker was idle or paused; the fix was dropped.
    NotRunning,
    /// Horizontal accuracy exceeded the limit; the fix was dropped.
    WeakSignal { accuracy_m: f64 },
    /// Moved less than the minimum distance from the last admitted fix.
    Jitter { delta_km: f64 },
    /// First admitted fix of the activity. Contributes no distance.
    Bootstrapped,
    /// Admitted; `delta_km` was added to the running distance.
    Admitted { delta_km: f64 },
}

impl IngestOutcome {
    /// True if the fix was appended to the trace.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Bootstrapped | Self::Admitted { .. })
    }
}

/// In-progress metrics of the current activity.
///
/// `pace_sec_per_km` is shared by both update paths: a fix carrying a positive
/// speed writes the instantaneous pace, a tick writes the running average, and
/// whichever came last is what it holds. The two separate fields keep each
/// value on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub elapsed_seconds: u32,
    pub distance_km: f64,
    pub pace_sec_per_km: f64,
    /// Last pace derived from GPS speed (0 until a fix reports speed).
    pub instant_pace_sec_per_km: f64,
    /// `elapsed_seconds / distance_km` as of the last tick (0 with no distance).
    pub average_pace_sec_per_km: f64,
    pub last_admitted: Option<GeoSample>,
    pub trace: Vec<GeoSample>,
}

impl LiveSnapshot {
    /// A zeroed snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.elapsed_seconds == 0 && self.trace.is_empty()
    }

    /// Fold one GPS fix into the snapshot.
    ///
    /// Filters run in order: coordinate validation, accuracy, then jitter
    /// against the last *admitted* fix. A jitter-filtered fix leaves
    /// `last_admitted` alone so slow drift still adds up once it crosses the
    /// threshold.
    pub fn fold_sample(&mut self, sample: GeoSample, config: &TrackerConfig) -> Result<IngestOutcome> {
        if !geo_utils::is_valid_coordinate(sample.latitude, sample.longitude) {
            warn!(
                "[LiveSnapshot] Rejecting fix with invalid coordinate ({}, {})",
                sample.latitude, sample.longitude
            );
            return Err(crate::TrackerError::InvalidCoordinate {
                latitude: sample.latitude,
                longitude: sample.longitude,
            });
        }

        // An unknown (NaN) accuracy is as bad as a large one
        if sample.horizontal_accuracy_m.is_nan()
            || sample.horizontal_accuracy_m > config.max_horizontal_accuracy_m
        {
            warn!(
                "[LiveSnapshot] Weak signal: accuracy {:.1}m > {:.1}m",
                sample.horizontal_accuracy_m, config.max_horizontal_accuracy_m
            );
            return Ok(IngestOutcome::WeakSignal {
                accuracy_m: sample.horizontal_accuracy_m,
            });
        }

        let outcome = match &self.last_admitted {
            Some(last) => {
                let delta_km = geo_utils::distance_km(last, &sample)?;
                if delta_km < config.min_movement_km {
                    debug!("[LiveSnapshot] Jitter: {:.1}m", delta_km * 1000.0);
                    return Ok(IngestOutcome::Jitter { delta_km });
                }
                self.distance_km += delta_km;
                IngestOutcome::Admitted { delta_km }
            }
            None => IngestOutcome::Bootstrapped,
        };

        if let Some(speed) = sample.speed_mps.filter(|s| s.is_finite() && *s > 0.0) {
            self.instant_pace_sec_per_km = 1000.0 / speed;
            self.pace_sec_per_km = self.instant_pace_sec_per_km;
        }

        self.trace.push(sample);
        self.last_admitted = Some(sample);

        debug!(
            "[LiveSnapshot] {:?} -> {:.4} km over {} fixes",
            outcome,
            self.distance_km,
            self.trace.len()
        );
        Ok(outcome)
    }

    /// Advance the clock by one second and recompute the average pace.
    ///
    /// Overwrites `pace_sec_per_km`, including any speed-derived value.
    pub fn advance_second(&mut self) {
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        self.average_pace_sec_per_km = average_pace(self.elapsed_seconds, self.distance_km);
        self.pace_sec_per_km = self.average_pace_sec_per_km;
    }
}

/// Seconds per kilometer, or 0 when no distance has been covered.
pub fn average_pace(elapsed_seconds: u32, distance_km: f64) -> f64 {
    if distance_km > 0.0 {
        f64::from(elapsed_seconds) / distance_km
    } else {
        0.0
    }
}
