//! Achievement records and milestone rules.
//!
//! Milestones are evaluated after every finished activity and reported to the
//! caller, but nothing is unlocked automatically: which badge a milestone maps
//! to is a product decision that lives outside the engine.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ActivityHistory;

/// Badge color tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementTier {
    Gold,
    Silver,
    Bronze,
    Primary,
}

/// An unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at_ms: i64,
    pub tier: AchievementTier,
}

impl Achievement {
    /// The achievement every new profile starts with.
    pub fn first_steps(unlocked_at_ms: i64) -> Self {
        Self {
            id: "1".to_string(),
            title: "First Steps".to_string(),
            description: "Complete your first run".to_string(),
            icon: "directions_run".to_string(),
            unlocked_at_ms,
            tier: AchievementTier::Bronze,
        }
    }
}

/// Seed list for a profile with nothing persisted yet.
pub fn default_achievements(now_ms: i64) -> Vec<Achievement> {
    vec![Achievement::first_steps(now_ms)]
}

/// History milestones that are checked after each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneRule {
    /// At least five activities in history
    FiveRuns,
    /// More than 10 km across all completed activities
    TenKilometers,
}

impl MilestoneRule {
    pub const ALL: [MilestoneRule; 2] = [MilestoneRule::FiveRuns, MilestoneRule::TenKilometers];

    pub fn is_met(&self, history: &ActivityHistory) -> bool {
        match self {
            Self::FiveRuns => history.len() >= 5,
            Self::TenKilometers => history.lifetime_totals().distance_km > 10.0,
        }
    }
}

/// Milestones the history currently satisfies.
pub fn met_milestones(history: &ActivityHistory) -> Vec<MilestoneRule> {
    let met: Vec<MilestoneRule> = MilestoneRule::ALL
        .iter()
        .copied()
        .filter(|rule| rule.is_met(history))
        .collect();
    if !met.is_empty() {
        debug!("[Achievements] Milestones met (not unlocked): {:?}", met);
    }
    met
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activity, ActivityKind, ActivityStatus};

    fn run(id: usize, distance_km: f64) -> Activity {
        Activity {
            id: id.to_string(),
            kind: ActivityKind::OutdoorRun,
            started_at_ms: 0,
            ended_at_ms: 0,
            duration_seconds: 600,
            distance_km,
            average_pace_sec_per_km: 0.0,
            energy_estimate_kcal: 0,
            route: Vec::new(),
            status: ActivityStatus::Completed,
            notes: None,
        }
    }

    #[test]
    fn test_default_seed() {
        let seeded = default_achievements(42);
        assert_eq!(seeded.len(), 1);
        assert_eq!(seeded[0].title, "First Steps");
        assert_eq!(seeded[0].tier, AchievementTier::Bronze);
        assert_eq!(seeded[0].unlocked_at_ms, 42);
    }

    #[test]
    fn test_milestones() {
        let history = ActivityHistory::from_vec((0..4).map(|i| run(i, 2.0)).collect());
        assert!(met_milestones(&history).is_empty());

        let history = ActivityHistory::from_vec((0..5).map(|i| run(i, 2.5)).collect());
        assert_eq!(
            met_milestones(&history),
            vec![MilestoneRule::FiveRuns, MilestoneRule::TenKilometers]
        );
    }

    #[test]
    fn test_ten_km_is_strict() {
        let history = ActivityHistory::from_vec(vec![run(0, 10.0)]);
        assert!(!MilestoneRule::TenKilometers.is_met(&history));
    }
}
