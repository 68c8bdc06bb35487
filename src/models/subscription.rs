// src/models/subscription.rs

//! Subscription plans, limits and usage counters.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Subscription plan of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Premium,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
            Plan::Pro => "pro",
        }
    }

    /// Limits that apply to this plan. `None` means unlimited.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                pathway_generations: Some(3),
                history_depth: Some(1),
                detailed_analyses: Some(0),
                full_pathway_view: false,
            },
            Plan::Premium => PlanLimits {
                pathway_generations: Some(25),
                history_depth: Some(10),
                detailed_analyses: Some(5),
                full_pathway_view: true,
            },
            Plan::Pro => PlanLimits {
                pathway_generations: None,
                history_depth: None,
                detailed_analyses: None,
                full_pathway_view: true,
            },
        }
    }

    /// Cheapest plan that lifts the given monthly limit above `used`.
    pub fn upgrade_for(&self, feature: Feature, used: u32) -> Option<Plan> {
        [Plan::Premium, Plan::Pro]
            .into_iter()
            .filter(|p| p > self)
            .find(|p| p.limits().monthly_limit(feature).is_none_or(|l| l > used))
    }
}

impl PartialOrd for Plan {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Plan {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let rank = |p: &Plan| match p {
            Plan::Free => 0,
            Plan::Premium => 1,
            Plan::Pro => 2,
        };
        rank(self).cmp(&rank(other))
    }
}

/// Per-plan limit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub pathway_generations: Option<u32>,
    pub history_depth: Option<u32>,
    pub detailed_analyses: Option<u32>,
    pub full_pathway_view: bool,
}

impl PlanLimits {
    pub fn monthly_limit(&self, feature: Feature) -> Option<u32> {
        match feature {
            Feature::PathwayGeneration => self.pathway_generations,
            Feature::DetailedAnalysis => self.detailed_analyses,
        }
    }
}

/// Metered features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PathwayGeneration,
    DetailedAnalysis,
}

impl Feature {
    pub fn label(&self) -> &'static str {
        match self {
            Feature::PathwayGeneration => "AI pathway generations",
            Feature::DetailedAnalysis => "detailed pathway analyses",
        }
    }
}

/// Usage counters of one user for the current monthly period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUsage {
    pub user_id: String,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub pathway_generations: u32,
    #[serde(default)]
    pub detailed_analyses: u32,
    pub period_start: DateTime<Utc>,
}

impl SubscriptionUsage {
    pub fn new(user_id: impl Into<String>, plan: Plan) -> Self {
        Self {
            user_id: user_id.into(),
            plan,
            pathway_generations: 0,
            detailed_analyses: 0,
            period_start: Utc::now(),
        }
    }

    /// Whether `now` falls in the same calendar month as the period start.
    pub fn is_current_period(&self, now: DateTime<Utc>) -> bool {
        self.period_start.year() == now.year() && self.period_start.month() == now.month()
    }

    /// Counter for a feature, zero once the period is over.
    pub fn used(&self, feature: Feature, now: DateTime<Utc>) -> u32 {
        if !self.is_current_period(now) {
            return 0;
        }
        match feature {
            Feature::PathwayGeneration => self.pathway_generations,
            Feature::DetailedAnalysis => self.detailed_analyses,
        }
    }

    /// Count one use, starting a new period first if the month rolled over.
    pub fn record(&mut self, feature: Feature, now: DateTime<Utc>) {
        if !self.is_current_period(now) {
            self.pathway_generations = 0;
            self.detailed_analyses = 0;
            self.period_start = now;
        }
        match feature {
            Feature::PathwayGeneration => self.pathway_generations += 1,
            Feature::DetailedAnalysis => self.detailed_analyses += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plan_ordering() {
        assert!(Plan::Free < Plan::Premium);
        assert!(Plan::Premium < Plan::Pro);
    }

    #[test]
    fn upgrade_picks_cheapest_sufficient_plan() {
        assert_eq!(
            Plan::Free.upgrade_for(Feature::PathwayGeneration, 3),
            Some(Plan::Premium)
        );
        assert_eq!(
            Plan::Premium.upgrade_for(Feature::PathwayGeneration, 25),
            Some(Plan::Pro)
        );
        assert_eq!(Plan::Pro.upgrade_for(Feature::PathwayGeneration, 1000), None);
    }

    #[test]
    fn record_rolls_over_month() {
        let march = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

        let mut usage = SubscriptionUsage::new("u1", Plan::Free);
        usage.period_start = march;
        usage.record(Feature::PathwayGeneration, march);
        usage.record(Feature::PathwayGeneration, march);
        assert_eq!(usage.used(Feature::PathwayGeneration, march), 2);
        assert_eq!(usage.used(Feature::PathwayGeneration, april), 0);

        usage.record(Feature::PathwayGeneration, april);
        assert_eq!(usage.pathway_generations, 1);
        assert_eq!(usage.period_start, april);
    }
}
