// src/app.rs

//! Service wiring, done once at process start.

use std::sync::Arc;

use chrono::Utc;

use crate::config::Secrets;
use crate::error::{AppError, Result};
use crate::models::{Config, Feature, PathwayProfile, SubscriptionUsage};
use crate::services::usage::evaluate;
use crate::services::{
    Authenticator, CurrencyService, Gate, GeminiClient, PathwayGenerator, PathwayResolver,
    PathwaySource, PlaceSource, PlacesClient, ProfileService, ResolvedPathway, UniversityService,
    UsageService, UserPathwayService,
};
use crate::storage::Db;
use crate::utils::http;

/// Every service the REST layer and the CLI jobs need.
pub struct AppContext {
    pub config: Config,
    pub db: Db,
    pub resolver: PathwayResolver,
    pub usage: UsageService,
    pub profiles: ProfileService,
    pub user_pathways: UserPathwayService,
    pub universities: UniversityService,
    pub currency: CurrencyService,
    pub auth: Authenticator,
    /// `None` when no Places key is configured
    pub places: Option<Arc<dyn PlaceSource>>,
}

impl AppContext {
    pub fn new(config: Config, db: Db, secrets: Secrets) -> Result<Self> {
        let client = http::create_client(&config.http)?;

        let generator: Option<Arc<dyn PathwayGenerator>> = match secrets.gemini {
            Some(key) => Some(Arc::new(GeminiClient::new(client.clone(), &config.ai, key))),
            None => {
                log::warn!(
                    "{} not set; pathways will come from cache or the static fallback",
                    config.ai.api_key_env
                );
                None
            }
        };

        // The proxy may hold the key itself, so a missing key is not fatal
        let places: Option<Arc<dyn PlaceSource>> =
            if secrets.places.is_some() || !config.places.base_url.contains("googleapis.com") {
                Some(Arc::new(PlacesClient::new(
                    client.clone(),
                    &config.places,
                    secrets.places,
                )))
            } else {
                None
            };

        Ok(Self {
            resolver: PathwayResolver::new(db.clone(), generator),
            usage: UsageService::new(db.clone()),
            profiles: ProfileService::new(db.clone()),
            user_pathways: UserPathwayService::new(db.clone()),
            universities: UniversityService::new(db.clone()),
            currency: CurrencyService::new(client.clone(), db.clone(), &config.currency),
            auth: Authenticator::from_config(&config.auth, client, secrets.firebase),
            places,
            db,
            config,
        })
    }

    pub fn generator(&self) -> Option<&Arc<dyn PathwayGenerator>> {
        self.resolver.generator()
    }

    /// Resolve a pathway on behalf of a user.
    ///
    /// Refused once the plan's generations for the month are used up. Only a
    /// fresh model generation is recorded; cache, similar and static results
    /// cost nothing. Returns the usage after recording.
    pub async fn resolve_for(
        &self,
        user_id: &str,
        profile: &PathwayProfile,
    ) -> Result<(ResolvedPathway, SubscriptionUsage)> {
        let usage = self.usage.usage(user_id).await?;
        if let Gate::Denied { upgrade_prompt } =
            evaluate(&usage, Feature::PathwayGeneration, Utc::now())
        {
            return Err(AppError::LimitReached(upgrade_prompt));
        }

        let resolved = self.resolver.resolve(profile).await;
        let usage = if resolved.source == PathwaySource::Ai {
            log::debug!("Recording generation of {} for {}", profile.key(), user_id);
            self.usage.record(user_id, Feature::PathwayGeneration).await?
        } else {
            usage
        };
        Ok((resolved, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_profile;
    use crate::models::{PathwayKind, PathwayTemplate, Plan};
    use crate::services::static_pathway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TallyGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PathwayGenerator for TallyGenerator {
        async fn generate(&self, profile: &PathwayProfile) -> Result<PathwayTemplate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut template = static_pathway::generate(profile);
            template.kind = PathwayKind::AiGenerated {
                model: "tally".into(),
            };
            Ok(template)
        }

        async fn analyze(&self, _: &PathwayProfile, _: &PathwayTemplate) -> Result<String> {
            Ok("analysis".into())
        }
    }

    fn with_generator(generator: Arc<TallyGenerator>) -> AppContext {
        let mut ctx =
            AppContext::new(Config::default(), Db::in_memory(), Secrets::default()).unwrap();
        ctx.resolver = PathwayResolver::new(ctx.db.clone(), Some(generator));
        ctx
    }

    #[test]
    fn builds_without_secrets() {
        let ctx = AppContext::new(Config::default(), Db::in_memory(), Secrets::default()).unwrap();
        assert!(ctx.generator().is_none());
        assert!(ctx.places.is_none());
    }

    #[tokio::test]
    async fn only_model_generations_are_counted() {
        let generator = Arc::new(TallyGenerator::default());
        let ctx = with_generator(generator.clone());
        let profile = sample_profile();

        let (first, usage) = ctx.resolve_for("u1", &profile).await.unwrap();
        assert_eq!(first.source, PathwaySource::Ai);
        assert_eq!(usage.pathway_generations, 1);

        let (again, usage) = ctx.resolve_for("u1", &profile).await.unwrap();
        assert_eq!(again.source, PathwaySource::Cache);
        assert_eq!(usage.pathway_generations, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_plan_never_reaches_the_model() {
        let generator = Arc::new(TallyGenerator::default());
        let ctx = with_generator(generator.clone());
        for _ in 0..3 {
            ctx.usage
                .record("u1", Feature::PathwayGeneration)
                .await
                .unwrap();
        }

        let err = ctx.resolve_for("u1", &sample_profile()).await.unwrap_err();
        assert!(matches!(err, AppError::LimitReached(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

        ctx.usage.set_plan("u1", Plan::Premium).await.unwrap();
        let (_, usage) = ctx.resolve_for("u1", &sample_profile()).await.unwrap();
        assert_eq!(usage.pathway_generations, 4);
    }
}
