// src/services/usage.rs

//! Subscription gating of metered features and the free-tier pathway view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Feature, PathwayKind, PathwayTemplate, Plan, SubscriptionUsage};
use crate::storage::Db;

/// Steps shown to free users.
pub const FREE_STEP_LIMIT: usize = 3;
/// Tasks shown per step to free users.
pub const FREE_TASK_LIMIT: usize = 2;
/// Recommended universities shown to free users.
pub const FREE_UNIVERSITY_LIMIT: usize = 3;

/// Outcome of a usage check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Gate {
    /// `remaining` is `None` on unlimited plans
    Allowed { remaining: Option<u32> },
    Denied { upgrade_prompt: String },
}

impl Gate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Gate::Allowed { .. })
    }
}

/// Compare a usage record against its plan's limit.
pub fn evaluate(usage: &SubscriptionUsage, feature: Feature, now: DateTime<Utc>) -> Gate {
    let used = usage.used(feature, now);
    match usage.plan.limits().monthly_limit(feature) {
        None => Gate::Allowed { remaining: None },
        Some(limit) if used < limit => Gate::Allowed {
            remaining: Some(limit - used),
        },
        Some(limit) => Gate::Denied {
            upgrade_prompt: upgrade_prompt(usage.plan, feature, used, limit),
        },
    }
}

/// Human-readable message naming the plan that lifts the limit.
pub fn upgrade_prompt(plan: Plan, feature: Feature, used: u32, limit: u32) -> String {
    let head = if limit == 0 {
        format!(
            "{} are not included in the {} plan.",
            capitalize(feature.label()),
            plan.as_str()
        )
    } else {
        format!(
            "You have used {used} of {limit} {} this month.",
            feature.label()
        )
    };

    match plan.upgrade_for(feature, used) {
        Some(next) => {
            let allowance = match next.limits().monthly_limit(feature) {
                Some(n) => format!("{n} per month"),
                None => "unlimited use".to_string(),
            };
            format!(
                "{head} Upgrade to {} for {allowance}.",
                capitalize(next.as_str())
            )
        }
        None => format!("{head} Your limit resets at the start of next month."),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Reduced pathway for plans without the full view.
///
/// Keeps the first steps with their first tasks, drops costs and
/// scholarships and truncates the university list.
pub fn limited_view(template: &PathwayTemplate) -> PathwayTemplate {
    let full_step_count = template.steps.len();
    let mut limited = template.clone();

    limited.steps.truncate(FREE_STEP_LIMIT);
    for step in &mut limited.steps {
        step.tasks.truncate(FREE_TASK_LIMIT);
        step.estimated_cost = None;
        step.is_limited = true;
    }
    limited.costs = None;
    limited.scholarships.clear();
    limited.universities.truncate(FREE_UNIVERSITY_LIMIT);
    limited.kind = PathwayKind::Limited { full_step_count };
    limited.upgrade_prompt = Some(format!(
        "Upgrade to Premium to unlock all {full_step_count} steps, the full cost breakdown and scholarships."
    ));
    limited
}

/// Shape a template for a plan.
pub fn view_for_plan(template: PathwayTemplate, plan: Plan) -> PathwayTemplate {
    if plan.limits().full_pathway_view {
        template
    } else {
        limited_view(&template)
    }
}

/// Usage counters in the store.
#[derive(Clone)]
pub struct UsageService {
    db: Db,
}

impl UsageService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Usage record of a user, a fresh free one if none is stored.
    pub async fn usage(&self, user_id: &str) -> Result<SubscriptionUsage> {
        Ok(self
            .db
            .usage(user_id)
            .await?
            .unwrap_or_else(|| SubscriptionUsage::new(user_id, Plan::Free)))
    }

    pub async fn plan(&self, user_id: &str) -> Result<Plan> {
        Ok(self.usage(user_id).await?.plan)
    }

    pub async fn check(&self, user_id: &str, feature: Feature) -> Result<Gate> {
        let usage = self.usage(user_id).await?;
        Ok(evaluate(&usage, feature, Utc::now()))
    }

    /// Count one use of a feature.
    pub async fn record(&self, user_id: &str, feature: Feature) -> Result<SubscriptionUsage> {
        let mut usage = self.usage(user_id).await?;
        usage.record(feature, Utc::now());
        self.db.save_usage(&usage).await?;
        log::debug!(
            "Recorded {:?} for {} ({} generations, {} analyses)",
            feature,
            user_id,
            usage.pathway_generations,
            usage.detailed_analyses
        );
        Ok(usage)
    }

    pub async fn set_plan(&self, user_id: &str, plan: Plan) -> Result<SubscriptionUsage> {
        let mut usage = self.usage(user_id).await?;
        usage.plan = plan;
        self.db.save_usage(&usage).await?;
        Ok(usage)
    }
}
