//! Resolution chain behaviour over the filesystem store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;
use uniguide::error::{AppError, Result};
use uniguide::models::{
    AcademicLevel, BudgetRange, PathwayKind, PathwayProfile, PathwayTemplate, Plan,
};
use uniguide::services::static_pathway;
use uniguide::services::usage::{FREE_TASK_LIMIT, view_for_plan};
use uniguide::services::{PathwayGenerator, PathwayResolver, PathwaySource};
use uniguide::storage::{Db, LocalStorage};

struct MockGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl MockGenerator {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PathwayGenerator for MockGenerator {
    async fn generate(&self, profile: &PathwayProfile) -> Result<PathwayTemplate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::upstream("gemini", "503 Service Unavailable"));
        }
        let mut template = static_pathway::generate(profile);
        template.kind = PathwayKind::AiGenerated {
            model: "mock".into(),
        };
        Ok(template)
    }

    async fn analyze(&self, _: &PathwayProfile, template: &PathwayTemplate) -> Result<String> {
        Ok(format!("{} steps", template.steps.len()))
    }
}

fn local_db(dir: &TempDir) -> Db {
    Db::new(Arc::new(LocalStorage::new(dir.path())))
}

fn profile(country: &str, course: &str, level: AcademicLevel) -> PathwayProfile {
    PathwayProfile {
        country: country.to_string(),
        course: course.to_string(),
        academic_level: level,
        budget_range: BudgetRange::Medium,
        nationality: "Indian".to_string(),
    }
}

#[tokio::test]
async fn generated_pathway_is_served_from_cache_after_restart() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerator::new(false);
    let wanted = profile("United Kingdom", "Data Science", AcademicLevel::Postgraduate);

    let resolver = PathwayResolver::new(local_db(&dir), Some(generator.clone()));
    let first = resolver.resolve(&wanted).await;
    assert_eq!(first.source, PathwaySource::Ai);

    let again = resolver.resolve(&wanted).await;
    assert_eq!(again.source, PathwaySource::Cache);
    assert_eq!(generator.calls(), 1);

    // fresh process, same directory, no model configured
    let restarted = PathwayResolver::new(local_db(&dir), None);
    let cached = restarted.resolve(&wanted).await;
    assert_eq!(cached.source, PathwaySource::Cache);
    assert_eq!(cached.template.steps, first.template.steps);
    assert!(matches!(cached.template.kind, PathwayKind::AiGenerated { .. }));
}

#[tokio::test]
async fn failing_model_falls_back_to_static() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerator::new(true);
    let resolver = PathwayResolver::new(local_db(&dir), Some(generator.clone()));
    let wanted = profile("Germany", "Mechanical Engineering", AcademicLevel::Undergraduate);

    let resolved = resolver.resolve(&wanted).await;
    assert_eq!(resolved.source, PathwaySource::Static);
    assert_eq!(resolved.template.kind, PathwayKind::Static);
    assert!(!resolved.template.steps.is_empty());

    let second = resolver.resolve(&wanted).await;
    assert_eq!(second.source, PathwaySource::Cache);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn similar_template_is_adapted_without_model_call() {
    let dir = TempDir::new().unwrap();
    let generator = MockGenerator::new(false);
    let resolver = PathwayResolver::new(local_db(&dir), Some(generator.clone()));

    resolver
        .resolve(&profile("Canada", "Computer Science", AcademicLevel::Postgraduate))
        .await;
    let other = profile("Canada", "Computer Science", AcademicLevel::Doctorate);
    let adapted = resolver.resolve(&other).await;

    assert_eq!(adapted.source, PathwaySource::Similar);
    assert!(adapted.template.is_adapted);
    assert_eq!(adapted.template.key, other.key());
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn every_profile_resolves() {
    let dir = TempDir::new().unwrap();
    let resolver = PathwayResolver::new(local_db(&dir), Some(MockGenerator::new(true)));

    for country in ["USA", "Australia", "Narnia", ""] {
        for level in AcademicLevel::ALL {
            let wanted = profile(country, "Nursing", level);
            let resolved = resolver.resolve(&wanted).await;
            assert!(!resolved.template.steps.is_empty(), "{}", wanted.key());
            assert_eq!(resolved.template.key, wanted.key());
            assert!(resolved.template.personalization.is_some());
        }
    }
}

#[tokio::test]
async fn free_view_limits_every_step() {
    let resolver = PathwayResolver::new(Db::in_memory(), None);
    let resolved = resolver
        .resolve(&profile("Australia", "Business", AcademicLevel::Postgraduate))
        .await;

    let free = view_for_plan(resolved.template.clone(), Plan::Free);
    assert!(
        free.steps
            .iter()
            .all(|s| s.is_limited && s.tasks.len() <= FREE_TASK_LIMIT)
    );
    assert!(free.upgrade_prompt.is_some());

    let full = view_for_plan(resolved.template, Plan::Premium);
    assert!(full.steps.iter().all(|s| !s.is_limited));
}
