// src/services/user_pathways.rs

//! Saved pathways of a user, one per destination country.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{PathwayTemplate, Plan, StepStatus, UserPathway};
use crate::storage::Db;

/// Partial update of one step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepUpdate {
    #[serde(default)]
    pub status: Option<StepStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome of saving a template for a user.
#[derive(Debug, Clone, Serialize)]
pub struct SavedPathway {
    pub pathway: UserPathway,
    /// True when an existing pathway for the country was refreshed
    pub merged: bool,
}

#[derive(Clone)]
pub struct UserPathwayService {
    db: Db,
}

impl UserPathwayService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Save a template as the user's pathway for its country.
    ///
    /// An existing pathway for the same country is refreshed in place and
    /// keeps the progress of every step number that still exists.
    pub async fn save(&self, user_id: &str, template: &PathwayTemplate) -> Result<SavedPathway> {
        let existing = self
            .db
            .user_pathways(user_id)
            .await?
            .into_iter()
            .find(|p| p.is_for_country(&template.profile.country));

        let (pathway, merged) = match existing {
            Some(mut pathway) => {
                pathway.merge_template(template);
                (pathway, true)
            }
            None => (UserPathway::from_template(user_id, template), false),
        };

        self.db.save_user_pathway(&pathway).await?;
        log::info!(
            "{} pathway {} for {} ({})",
            if merged { "Updated" } else { "Created" },
            pathway.id,
            user_id,
            pathway.country
        );
        Ok(SavedPathway { pathway, merged })
    }

    /// Saved pathways, newest first, cut to the plan's history depth.
    pub async fn list(&self, user_id: &str, plan: Plan) -> Result<Vec<UserPathway>> {
        let mut pathways = self.db.user_pathways(user_id).await?;
        if let Some(depth) = plan.limits().history_depth {
            pathways.truncate(depth as usize);
        }
        Ok(pathways)
    }

    /// Change the status and/or notes of one step of an owned pathway.
    pub async fn update_step(
        &self,
        user_id: &str,
        pathway_id: &str,
        number: u32,
        update: StepUpdate,
    ) -> Result<UserPathway> {
        let mut pathway = self
            .db
            .user_pathway(pathway_id)
            .await?
            .ok_or_else(|| AppError::not_found("Pathway", pathway_id))?;

        if pathway.user_id != user_id {
            return Err(AppError::forbidden("Pathway belongs to another user"));
        }

        let now = Utc::now();
        let step = pathway
            .step_mut(number)
            .ok_or_else(|| AppError::not_found("Step", number.to_string()))?;

        if let Some(status) = update.status {
            step.completed_at = match status {
                StepStatus::Completed => step.completed_at.or(Some(now)),
                _ => None,
            };
            step.status = status;
        }
        if let Some(notes) = update.notes {
            step.notes = notes;
        }
        pathway.updated_at = now;

        self.db.save_user_pathway(&pathway).await?;
        Ok(pathway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_profile;
    use crate::services::static_pathway;

    #[tokio::test]
    async fn same_country_merges_progress() {
        let service = UserPathwayService::new(Db::in_memory());
        let template = static_pathway::generate(&sample_profile());

        let first = service.save("u1", &template).await.unwrap();
        assert!(!first.merged);
        service
            .update_step(
                "u1",
                &first.pathway.id,
                1,
                StepUpdate {
                    status: Some(StepStatus::Completed),
                    notes: Some("shortlist ready".into()),
                },
            )
            .await
            .unwrap();

        let mut refreshed_profile = sample_profile();
        refreshed_profile.course = "Data Science".into();
        let refreshed = static_pathway::generate(&refreshed_profile);
        let second = service.save("u1", &refreshed).await.unwrap();

        assert!(second.merged);
        assert_eq!(second.pathway.id, first.pathway.id);
        assert_eq!(second.pathway.template_key, refreshed.key);
        assert_eq!(second.pathway.steps[0].status, StepStatus::Completed);
        assert_eq!(second.pathway.steps[0].notes, "shortlist ready");
        assert!(second.pathway.steps[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn other_country_creates_new_pathway() {
        let service = UserPathwayService::new(Db::in_memory());
        let canada = static_pathway::generate(&sample_profile());
        let mut germany_profile = sample_profile();
        germany_profile.country = "Germany".into();
        let germany = static_pathway::generate(&germany_profile);

        let a = service.save("u1", &canada).await.unwrap();
        let b = service.save("u1", &germany).await.unwrap();
        assert_ne!(a.pathway.id, b.pathway.id);

        assert_eq!(service.list("u1", Plan::Premium).await.unwrap().len(), 2);
        assert_eq!(service.list("u1", Plan::Free).await.unwrap().len(), 1);
        assert!(service.list("u2", Plan::Pro).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_step_checks_owner_and_step() {
        let service = UserPathwayService::new(Db::in_memory());
        let template = static_pathway::generate(&sample_profile());
        let saved = service.save("u1", &template).await.unwrap();
        let id = saved.pathway.id.clone();

        let err = service
            .update_step("u2", &id, 1, StepUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .update_step("u1", &id, 99, StepUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "Step", .. }));

        let err = service
            .update_step("u1", "missing", 1, StepUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "Pathway", .. }));
    }

    #[tokio::test]
    async fn reopening_a_step_clears_completion() {
        let service = UserPathwayService::new(Db::in_memory());
        let template = static_pathway::generate(&sample_profile());
        let id = service.save("u1", &template).await.unwrap().pathway.id;

        let done = StepUpdate {
            status: Some(StepStatus::Completed),
            notes: None,
        };
        let pathway = service.update_step("u1", &id, 2, done).await.unwrap();
        assert!(pathway.steps[1].completed_at.is_some());

        let reopen = StepUpdate {
            status: Some(StepStatus::InProgress),
            notes: None,
        };
        let pathway = service.update_step("u1", &id, 2, reopen).await.unwrap();
        assert_eq!(pathway.steps[1].status, StepStatus::InProgress);
        assert!(pathway.steps[1].completed_at.is_none());
        assert_eq!(pathway.progress_percent(), 0);
    }
}
