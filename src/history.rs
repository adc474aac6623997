//! Archived activities, weekly goals and summaries over the history.

use chrono::{DateTime, Datelike, Days, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::Activity;

/// Weekly targets set by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    /// Default: 40.0 km
    pub weekly_distance_km: f64,
    /// Default: 4 runs
    pub weekly_runs: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            weekly_distance_km: 40.0,
            weekly_runs: 4,
        }
    }
}

impl Goals {
    /// Reject non-finite or non-positive targets.
    pub fn validate(&self) -> Result<()> {
        if !self.weekly_distance_km.is_finite() || self.weekly_distance_km <= 0.0 {
            return Err(TrackerError::InvalidGoal(format!(
                "weekly distance must be positive, got {}",
                self.weekly_distance_km
            )));
        }
        if self.weekly_runs == 0 {
            return Err(TrackerError::InvalidGoal("weekly runs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Progress for the current week (Sunday 00:00 UTC onward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub week_start_ms: i64,
    pub runs: u32,
    pub distance_km: f64,
    pub duration_seconds: u64,
    /// Distance toward the weekly goal, capped at 100
    pub distance_progress_pct: f64,
    /// Runs toward the weekly goal, capped at 100
    pub runs_progress_pct: f64,
}

/// Totals over every completed activity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LifetimeTotals {
    pub runs: u32,
    pub distance_km: f64,
    pub duration_seconds: u64,
}

/// Archived activities, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityHistory {
    activities: Vec<Activity>,
}

impl ActivityHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already ordered (newest first) list.
    pub fn from_vec(activities: Vec<Activity>) -> Self {
        Self { activities }
    }

    pub fn as_slice(&self) -> &[Activity] {
        &self.activities
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    /// The `n` most recent activities.
    pub fn recent(&self, n: usize) -> &[Activity] {
        &self.activities[..n.min(self.activities.len())]
    }

    /// Insert as the newest entry.
    pub fn prepend(&mut self, activity: Activity) {
        self.activities.insert(0, activity);
    }

    /// Remove the activity with this id, if present.
    pub fn remove(&mut self, id: &str) -> Option<Activity> {
        let index = self.activities.iter().position(|a| a.id == id)?;
        debug!("[ActivityHistory] Removing {}", id);
        Some(self.activities.remove(index))
    }

    fn completed(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(|a| a.is_completed())
    }

    pub fn lifetime_totals(&self) -> LifetimeTotals {
        self.completed().fold(LifetimeTotals::default(), |mut acc, a| {
            acc.runs += 1;
            acc.distance_km += a.distance_km;
            acc.duration_seconds += u64::from(a.duration_seconds);
            acc
        })
    }

    /// Summarize the week containing `now_ms` against `goals`.
    pub fn weekly_summary(&self, goals: &Goals, now_ms: i64) -> WeeklySummary {
        let week_start_ms = week_start_ms(now_ms);

        let mut runs = 0u32;
        let mut distance_km = 0.0;
        let mut duration_seconds = 0u64;
        for activity in self.completed().filter(|a| a.started_at_ms >= week_start_ms) {
            runs += 1;
            distance_km += activity.distance_km;
            duration_seconds += u64::from(activity.duration_seconds);
        }

        WeeklySummary {
            week_start_ms,
            runs,
            distance_km,
            duration_seconds,
            distance_progress_pct: progress_pct(distance_km, goals.weekly_distance_km),
            runs_progress_pct: progress_pct(f64::from(runs), f64::from(goals.weekly_runs)),
        }
    }
}

fn progress_pct(value: f64, target: f64) -> f64 {
    if target > 0.0 {
        (value / target * 100.0).min(100.0)
    } else {
        0.0
    }
}

/// Sunday 00:00 UTC of the week containing `now_ms`.
pub fn week_start_ms(now_ms: i64) -> i64 {
    let Some(now) = DateTime::<Utc>::from_timestamp_millis(now_ms) else {
        return now_ms;
    };
    let back = Days::new(u64::from(now.weekday().num_days_from_sunday()));
    now.date_naive()
        .checked_sub_days(back)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .unwrap_or(now_ms)
}
