// src/models/user.rs

//! User profile and saved pathway structures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CostBreakdown, PathwayTemplate, Step, VisaInfo, normalize_key_part};

/// Profile of a signed-in student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub nationality: Option<String>,
    /// CGPA on the 10-point scale
    #[serde(default)]
    pub cgpa: Option<f64>,
    #[serde(default)]
    pub ielts: Option<f64>,
    #[serde(default)]
    pub target_countries: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: String::new(),
            nationality: None,
            cgpa: None,
            ielts: None,
            target_countries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Progress of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A template step together with the user's progress on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStep {
    #[serde(flatten)]
    pub step: Step,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Step> for UserStep {
    fn from(step: &Step) -> Self {
        Self {
            step: step.clone(),
            status: StepStatus::Pending,
            notes: String::new(),
            completed_at: None,
        }
    }
}

/// A user's copy of a template. One per (user, country).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPathway {
    pub id: String,
    pub user_id: String,
    pub country: String,
    pub template_key: String,
    pub title: String,
    pub steps: Vec<UserStep>,
    #[serde(default)]
    pub costs: Option<CostBreakdown>,
    #[serde(default)]
    pub visa: VisaInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPathway {
    /// Start a fresh pathway from a template with every step pending.
    pub fn from_template(user_id: &str, template: &PathwayTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            country: template.profile.country.clone(),
            template_key: template.key.clone(),
            title: template.title.clone(),
            steps: template.steps.iter().map(UserStep::from).collect(),
            costs: template.costs.clone(),
            visa: template.visa.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this pathway targets the given country.
    pub fn is_for_country(&self, country: &str) -> bool {
        normalize_key_part(&self.country) == normalize_key_part(country)
    }

    /// Replace the content with a newer template, keeping progress.
    ///
    /// Status, notes and completion time survive for every step number that
    /// still exists in the new template. Everything else comes from the
    /// template; steps that disappeared are dropped.
    pub fn merge_template(&mut self, template: &PathwayTemplate) {
        let mut previous: HashMap<u32, UserStep> = self
            .steps
            .drain(..)
            .map(|s| (s.step.number, s))
            .collect();

        self.steps = template
            .steps
            .iter()
            .map(|step| {
                let mut merged = UserStep::from(step);
                if let Some(old) = previous.remove(&step.number) {
                    merged.status = old.status;
                    merged.notes = old.notes;
                    merged.completed_at = old.completed_at;
                }
                merged
            })
            .collect();

        self.template_key = template.key.clone();
        self.title = template.title.clone();
        self.costs = template.costs.clone();
        self.visa = template.visa.clone();
        self.updated_at = Utc::now();
    }

    pub fn step_mut(&mut self, number: u32) -> Option<&mut UserStep> {
        self.steps.iter_mut().find(|s| s.step.number == number)
    }

    /// Completed steps as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let done = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        ((done * 100) / self.steps.len()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::static_pathway;
    use crate::models::pathway::tests::sample_profile;

    #[test]
    fn from_template_starts_pending() {
        let template = static_pathway::generate(&sample_profile());
        let pathway = UserPathway::from_template("u1", &template);

        assert_eq!(pathway.steps.len(), template.steps.len());
        assert!(pathway.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(pathway.progress_percent(), 0);
    }

    #[test]
    fn merge_keeps_progress_for_surviving_steps() {
        let template = static_pathway::generate(&sample_profile());
        let mut pathway = UserPathway::from_template("u1", &template);
        {
            let first = pathway.step_mut(1).unwrap();
            first.status = StepStatus::Completed;
            first.notes = "Done with shortlist".into();
        }
        pathway.step_mut(2).unwrap().status = StepStatus::InProgress;

        let mut refreshed = template.clone();
        refreshed.steps[0].title = "Research and shortlist programmes".into();
        refreshed.steps[0].tasks.reverse();
        refreshed.steps.truncate(3);

        pathway.merge_template(&refreshed);

        assert_eq!(pathway.steps.len(), 3);
        let first = &pathway.steps[0];
        assert_eq!(first.status, StepStatus::Completed);
        assert_eq!(first.notes, "Done with shortlist");
        assert_eq!(first.step.title, "Research and shortlist programmes");
        assert_eq!(pathway.steps[1].status, StepStatus::InProgress);
        assert_eq!(pathway.steps[2].status, StepStatus::Pending);
    }

    #[test]
    fn country_match_is_normalized() {
        let template = static_pathway::generate(&sample_profile());
        let pathway = UserPathway::from_template("u1", &template);
        assert!(pathway.is_for_country("canada"));
        assert!(!pathway.is_for_country("Germany"));
    }

    #[test]
    fn step_status_serializes_snake_case() {
        let json = serde_json::to_string(&StepStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
