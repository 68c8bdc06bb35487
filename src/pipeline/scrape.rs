// src/pipeline/scrape.rs

//! Pre-generation of pathway templates over a profile matrix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::{PathwayProfile, ScrapingConfig};
use crate::pipeline::progress::{ItemOutcome, Job, Progress};
use crate::services::PathwayGenerator;
use crate::storage::Db;
use crate::utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub total: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stopped: bool,
}

/// Every profile of the configured matrix, countries outermost.
pub fn combinations(config: &ScrapingConfig) -> Vec<PathwayProfile> {
    let mut profiles = Vec::new();
    for country in &config.countries {
        for course in &config.courses {
            for level in &config.levels {
                for budget in &config.budgets {
                    for nationality in &config.nationalities {
                        profiles.push(PathwayProfile {
                            country: country.clone(),
                            course: course.clone(),
                            academic_level: *level,
                            budget_range: *budget,
                            nationality: nationality.clone(),
                        });
                    }
                }
            }
        }
    }
    profiles
}

/// Generate and store a template for every combination that lacks one.
///
/// Strictly sequential with a fixed pause between AI calls. The stop flag is
/// checked before each combination; an in-flight call always completes.
pub async fn run_scrape(
    db: &Db,
    generator: &dyn PathwayGenerator,
    config: &ScrapingConfig,
    stop: &AtomicBool,
    progress: &Progress,
) -> ScrapeReport {
    let profiles = combinations(config);
    let delay = Duration::from_millis(config.ai_call_delay_ms);
    let mut report = ScrapeReport {
        total: profiles.len(),
        ..ScrapeReport::default()
    };

    utils::log::header("Scraping pathway templates");
    utils::log::sub_item(&format!("{} combinations", profiles.len()));
    progress.started(Job::ScrapePathways, Some(profiles.len()));

    let mut processed = 0;
    let mut called_ai = false;
    for (index, profile) in profiles.iter().enumerate() {
        if stop.load(Ordering::SeqCst) {
            report.stopped = true;
            break;
        }
        processed += 1;
        let key = profile.key();

        match db.template(&key).await {
            Ok(Some(_)) => {
                report.skipped += 1;
                progress.item(Job::ScrapePathways, index, &key, ItemOutcome::Skipped("exists".into()));
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                report.failed += 1;
                progress.item(Job::ScrapePathways, index, &key, ItemOutcome::Failed(e.to_string()));
                continue;
            }
        }

        if called_ai && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        called_ai = true;

        let outcome = match generator.generate(profile).await {
            Ok(template) => match db.save_template(&template).await {
                Ok(()) => {
                    report.generated += 1;
                    ItemOutcome::Done
                }
                Err(e) => {
                    report.failed += 1;
                    ItemOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                report.failed += 1;
                ItemOutcome::Failed(e.to_string())
            }
        };
        progress.item(Job::ScrapePathways, index, &key, outcome);
    }

    progress.finished(Job::ScrapePathways, processed, report.stopped);
    utils::log::summary(
        "Pathway Scrape Results",
        &[
            ("combinations", report.total.to_string()),
            ("generated", report.generated.to_string()),
            ("skipped", report.skipped.to_string()),
            ("failed", report.failed.to_string()),
            ("stopped early", report.stopped.to_string()),
        ],
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{AcademicLevel, BudgetRange, PathwayTemplate};
    use crate::services::static_pathway;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    /// Fails for Germany, raises the stop flag after `stop_after` calls.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        stop_after: usize,
        stop: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PathwayGenerator for ScriptedGenerator {
        async fn generate(&self, profile: &PathwayProfile) -> Result<PathwayTemplate> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                self.stop.store(true, Ordering::SeqCst);
            }
            if profile.country == "Germany" {
                return Err(AppError::upstream("gemini", "bad json"));
            }
            Ok(static_pathway::generate(profile))
        }

        async fn analyze(&self, _: &PathwayProfile, _: &PathwayTemplate) -> Result<String> {
            unreachable!()
        }
    }

    fn config() -> ScrapingConfig {
        ScrapingConfig {
            countries: vec!["Canada".into(), "Germany".into()],
            courses: vec!["Computer Science".into()],
            levels: vec![AcademicLevel::Postgraduate],
            budgets: vec![BudgetRange::Low, BudgetRange::High],
            nationalities: vec!["Indian".into()],
            ai_call_delay_ms: 0,
        }
    }

    #[test]
    fn combinations_cover_the_matrix() {
        let profiles = combinations(&config());
        assert_eq!(profiles.len(), 4);
        assert_eq!(profiles[0].country, "Canada");
        assert_eq!(profiles[0].budget_range, BudgetRange::Low);
        assert_eq!(profiles[3].country, "Germany");
    }

    #[tokio::test]
    async fn counts_generated_skipped_and_failed() {
        let db = Db::in_memory();
        let existing = combinations(&config()).remove(0);
        db.save_template(&static_pathway::generate(&existing))
            .await
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let generator = ScriptedGenerator {
            calls: AtomicUsize::new(0),
            stop_after: usize::MAX,
            stop: stop.clone(),
        };
        let report = run_scrape(&db, &generator, &config(), &stop, &Progress::none()).await;

        assert_eq!(
            report,
            ScrapeReport {
                total: 4,
                generated: 1,
                skipped: 1,
                failed: 2,
                stopped: false,
            }
        );
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stop_flag_is_honoured_between_items() {
        let db = Db::in_memory();
        let stop = Arc::new(AtomicBool::new(false));
        let generator = ScriptedGenerator {
            calls: AtomicUsize::new(0),
            stop_after: 1,
            stop: stop.clone(),
        };
        let report = run_scrape(&db, &generator, &config(), &stop, &Progress::none()).await;

        assert!(report.stopped);
        assert_eq!(report.generated, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
