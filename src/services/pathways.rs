// src/services/pathways.rs

//! Pathway resolution through a cheapest-first chain.
//!
//! 1. exact template for the profile key
//! 2. template of a similar profile, adapted
//! 3. AI generation
//! 4. static fallback
//!
//! Each link is isolated: an error is logged and the next link runs. New AI
//! and static templates are written through to the store so that the next
//! identical request is served by link 1.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::models::{PathwayProfile, PathwayTemplate, Personalization, normalize_key_part};
use crate::services::ai::PathwayGenerator;
use crate::services::currency::{convert_with, fallback_rates, format_amount};
use crate::services::static_pathway;
use crate::storage::Db;

/// Which link of the chain produced a pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathwaySource {
    Cache,
    Similar,
    Ai,
    Static,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPathway {
    pub template: PathwayTemplate,
    pub source: PathwaySource,
}

/// Profile dimensions kept when looking for a similar template, in order.
#[derive(Debug, Clone, Copy)]
enum Relaxation {
    CountryAndCourse,
    CountryAndLevel,
    CourseAndLevel,
    CountryOnly,
}

impl Relaxation {
    const ORDER: [Relaxation; 4] = [
        Relaxation::CountryAndCourse,
        Relaxation::CountryAndLevel,
        Relaxation::CourseAndLevel,
        Relaxation::CountryOnly,
    ];

    fn matches(self, want: &PathwayProfile, have: &PathwayProfile) -> bool {
        let country = want.same_country(&have.country);
        let course = want.same_course(&have.course);
        let level = want.academic_level == have.academic_level;
        match self {
            Relaxation::CountryAndCourse => country && course,
            Relaxation::CountryAndLevel => country && level,
            Relaxation::CourseAndLevel => course && level,
            Relaxation::CountryOnly => country,
        }
    }
}

pub struct PathwayResolver {
    db: Db,
    generator: Option<Arc<dyn PathwayGenerator>>,
}

impl PathwayResolver {
    pub fn new(db: Db, generator: Option<Arc<dyn PathwayGenerator>>) -> Self {
        Self { db, generator }
    }

    pub fn generator(&self) -> Option<&Arc<dyn PathwayGenerator>> {
        self.generator.as_ref()
    }

    /// Resolve a pathway for the profile. Always produces one.
    pub async fn resolve(&self, profile: &PathwayProfile) -> ResolvedPathway {
        let key = profile.key();

        match self.db.template(&key).await {
            Ok(Some(template)) => {
                log::debug!("Template cache hit for {}", key);
                return self.finish(template, profile, PathwaySource::Cache);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Template lookup failed for {}: {}", key, e),
        }

        match self.find_similar(profile).await {
            Ok(Some(template)) => {
                let adapted = template.adapted_to(profile);
                return self.finish(adapted, profile, PathwaySource::Similar);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Similar template search failed for {}: {}", key, e),
        }

        if let Some(generator) = &self.generator {
            match generator.generate(profile).await {
                Ok(template) => {
                    log::info!("Generated pathway {} with AI", key);
                    self.persist(&template).await;
                    return self.finish(template, profile, PathwaySource::Ai);
                }
                Err(e) => log::warn!("AI generation failed for {}: {}", key, e),
            }
        }

        log::info!("Using static pathway for {}", key);
        let template = static_pathway::generate(profile);
        self.persist(&template).await;
        self.finish(template, profile, PathwaySource::Static)
    }

    /// First stored template matching the earliest relaxation that matches any.
    async fn find_similar(&self, profile: &PathwayProfile) -> Result<Option<PathwayTemplate>> {
        let mut templates = self.db.templates().await?;
        if templates.is_empty() {
            return Ok(None);
        }

        for relaxation in Relaxation::ORDER {
            if let Some(pos) = templates
                .iter()
                .position(|t| relaxation.matches(profile, &t.profile))
            {
                let found = templates.swap_remove(pos);
                log::debug!(
                    "Similar template {} for {} ({:?})",
                    found.key,
                    profile.key(),
                    relaxation
                );
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn persist(&self, template: &PathwayTemplate) {
        if let Err(e) = self.db.save_template(template).await {
            log::warn!("Failed to store template {}: {}", template.key, e);
        }
    }

    fn finish(
        &self,
        mut template: PathwayTemplate,
        profile: &PathwayProfile,
        source: PathwaySource,
    ) -> ResolvedPathway {
        template.personalization = Some(personalize(&template, profile));
        ResolvedPathway { template, source }
    }
}

/// Budget alignment and nationality notes for a served template.
pub fn personalize(template: &PathwayTemplate, profile: &PathwayProfile) -> Personalization {
    Personalization {
        budget_message: budget_message(template, profile),
        notes: nationality_notes(profile),
    }
}

fn budget_message(template: &PathwayTemplate, profile: &PathwayProfile) -> String {
    let budget = profile.budget_range;
    let Some(costs) = &template.costs else {
        return format!(
            "A cost estimate is not available yet; plan against your budget of {}.",
            budget.label()
        );
    };

    let total = costs.total_first_year();
    let local = format_amount(total, &costs.currency);
    let Ok(total_usd) = convert_with(&fallback_rates(), total, &costs.currency, "USD") else {
        return format!("Estimated first-year cost is {local}.");
    };

    match budget.upper_bound_usd() {
        None => format!(
            "Estimated first-year cost is {local}, well within a budget {}.",
            budget.label()
        ),
        Some(limit) if total_usd <= limit => format!(
            "Estimated first-year cost is {local} (about {}), which fits your budget of {}.",
            format_amount(total_usd, "USD"),
            budget.label()
        ),
        Some(limit) => format!(
            "Estimated first-year cost is {local} (about {}), {} over your budget of {}. \
             Look at scholarships, assistantships and lower-cost cities.",
            format_amount(total_usd, "USD"),
            format_amount(total_usd - limit, "USD"),
            budget.label()
        ),
    }
}

fn nationality_notes(profile: &PathwayProfile) -> Vec<String> {
    let mut notes = Vec::new();
    match normalize_key_part(&profile.nationality).as_str() {
        "indian" => {
            notes.push("Education loans from Indian banks usually need an admission letter and collateral above INR 7.5 lakh.".to_string());
            notes.push("Apply early for visa appointments; slots from India fill up months ahead.".to_string());
        }
        "pakistani" | "bangladeshi" | "nigerian" => {
            notes.push("Expect additional document checks; keep bank statements for at least 6 months ready.".to_string());
        }
        "chinese" => {
            notes.push("Have your degree verified through CHESICC before applying.".to_string());
        }
        _ => {}
    }
    notes.push(format!(
        "Check whether {} waives English tests for {} applicants.",
        profile.country, profile.nationality
    ));
    notes
}
