//! Conversion of a live snapshot into an immutable [`Activity`].

use crate::snapshot::average_pace;
use crate::{Activity, ActivityKind, ActivityStatus, LiveSnapshot};

/// Placeholder energy estimate: `floor(distance_km * kcal_per_km)`.
///
/// ```
/// assert_eq!(stride_engine::energy_estimate_kcal(5.0, 60.0), 300);
/// assert_eq!(stride_engine::energy_estimate_kcal(0.0111, 60.0), 0);
/// ```
pub fn energy_estimate_kcal(distance_km: f64, kcal_per_km: f64) -> u32 {
    let kcal = (distance_km * kcal_per_km).floor();
    if kcal.is_finite() && kcal > 0.0 {
        kcal as u32
    } else {
        0
    }
}

/// Build a `Completed` activity from the snapshot as it stands at `ended_at_ms`.
///
/// Does not touch the snapshot; the caller resets live state. The start time
/// is back-computed from the elapsed seconds, and the average pace is
/// `duration / distance` (0 when no distance was covered).
pub fn finalize(
    snapshot: &LiveSnapshot,
    id: &str,
    kind: ActivityKind,
    ended_at_ms: i64,
    kcal_per_km: f64,
) -> Activity {
    let duration_seconds = snapshot.elapsed_seconds;
    Activity {
        id: id.to_string(),
        kind,
        started_at_ms: ended_at_ms - i64::from(duration_seconds) * 1000,
        ended_at_ms,
        duration_seconds,
        distance_km: snapshot.distance_km,
        average_pace_sec_per_km: average_pace(duration_seconds, snapshot.distance_km),
        energy_estimate_kcal: energy_estimate_kcal(snapshot.distance_km, kcal_per_km),
        route: snapshot.trace.clone(),
        status: ActivityStatus::Completed,
        notes: None,
    }
}
