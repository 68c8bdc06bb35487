// src/pipeline/populate.rs

//! University population from Places searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::models::{PlacesConfig, PopulateTarget, UniversityRecord};
use crate::pipeline::progress::{ItemOutcome, Job, Progress};
use crate::services::PlaceSource;
use crate::services::duplicates::{Candidate, find_duplicate};
use crate::storage::Db;
use crate::utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stopped: bool,
}

/// Search every target city and insert the universities not yet stored.
///
/// Inserts are checked for duplicates against stored records and against
/// records added earlier in the same run. Failures are counted; nothing is
/// rolled back.
pub async fn run_populate(
    db: &Db,
    places: &dyn PlaceSource,
    targets: &[PopulateTarget],
    config: &PlacesConfig,
    stop: &AtomicBool,
    progress: &Progress,
) -> Result<PopulateReport> {
    let delay = Duration::from_millis(config.request_delay_ms);
    let mut known: Vec<UniversityRecord> = db.universities().await?;
    let mut report = PopulateReport::default();

    let cities: Vec<(&str, &str)> = targets
        .iter()
        .flat_map(|t| t.cities.iter().map(move |c| (t.country.as_str(), c.as_str())))
        .collect();

    utils::log::header("Populating universities");
    utils::log::sub_item(&format!(
        "{} cities, {} universities already stored",
        cities.len(),
        known.len()
    ));
    progress.started(Job::Populate, None);

    let mut index = 0;
    let mut first_request = true;
    'cities: for (step, (country, city)) in cities.iter().enumerate() {
        utils::log::step(step + 1, cities.len(), &format!("{city}, {country}"));

        pause(delay, &mut first_request).await;
        let query = format!("universities in {city}, {country}");
        let results = match places.text_search(&query).await {
            Ok(results) => results,
            Err(e) => {
                report.failed += 1;
                progress.item(Job::Populate, index, &query, ItemOutcome::Failed(e.to_string()));
                index += 1;
                continue;
            }
        };

        for summary in results.into_iter().take(config.max_results_per_city) {
            if stop.load(Ordering::SeqCst) {
                report.stopped = true;
                break 'cities;
            }
            let label = format!("{} ({city})", summary.name);

            if known
                .iter()
                .any(|r| r.place_id.as_deref() == Some(summary.place_id.as_str()))
            {
                report.skipped += 1;
                progress.item(Job::Populate, index, label, ItemOutcome::Skipped("known place".into()));
                index += 1;
                continue;
            }

            pause(delay, &mut first_request).await;
            let outcome = match places.details(&summary.place_id).await {
                Ok(details) => {
                    let record = details.to_record(city, country);
                    match find_duplicate(Candidate::from(&record), &known) {
                        Some(dup) => {
                            report.skipped += 1;
                            ItemOutcome::Skipped(format!("duplicate of {}", dup.id))
                        }
                        None => match db.save_university(&record).await {
                            Ok(()) => {
                                report.added += 1;
                                known.push(record);
                                ItemOutcome::Done
                            }
                            Err(e) => {
                                report.failed += 1;
                                ItemOutcome::Failed(e.to_string())
                            }
                        },
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    ItemOutcome::Failed(e.to_string())
                }
            };
            progress.item(Job::Populate, index, label, outcome);
            index += 1;
        }
    }

    progress.finished(Job::Populate, index, report.stopped);
    utils::log::summary(
        "Populate Results",
        &[
            ("added", report.added.to_string()),
            ("skipped", report.skipped.to_string()),
            ("failed", report.failed.to_string()),
            ("stopped early", report.stopped.to_string()),
        ],
    );
    Ok(report)
}

async fn pause(delay: Duration, first: &mut bool) {
    if !*first && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    *first = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::RecordSource;
    use crate::models::fixtures::sample_university;
    use crate::services::places::{PlaceDetails, PlaceSummary};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakePlaces {
        searches: HashMap<String, Vec<(&'static str, &'static str)>>,
    }

    #[async_trait]
    impl PlaceSource for FakePlaces {
        async fn text_search(&self, query: &str) -> Result<Vec<PlaceSummary>> {
            let hits = self
                .searches
                .get(query)
                .ok_or_else(|| AppError::upstream("places", "OVER_QUERY_LIMIT"))?;
            Ok(hits
                .iter()
                .map(|(id, name)| PlaceSummary {
                    place_id: id.to_string(),
                    name: name.to_string(),
                    formatted_address: None,
                })
                .collect())
        }

        async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
            let name = self
                .searches
                .values()
                .flatten()
                .find(|(id, _)| *id == place_id)
                .map(|(_, name)| name.to_string())
                .ok_or_else(|| AppError::upstream("places", "NOT_FOUND"))?;
            Ok(PlaceDetails {
                place_id: place_id.to_string(),
                name,
                formatted_address: None,
                website: None,
                address_components: vec![],
            })
        }
    }

    fn config() -> PlacesConfig {
        PlacesConfig {
            request_delay_ms: 0,
            ..PlacesConfig::default()
        }
    }

    #[tokio::test]
    async fn adds_new_and_skips_duplicates() {
        let db = Db::in_memory();
        db.save_university(&sample_university("University of Toronto", "Toronto", "Canada"))
            .await
            .unwrap();

        let mut searches = HashMap::new();
        searches.insert(
            "universities in Toronto, Canada".to_string(),
            vec![
                ("p1", "University of Toronto"),
                ("p2", "York University"),
                ("p3", "York Univ."),
            ],
        );
        let places = FakePlaces { searches };
        let targets = vec![PopulateTarget {
            country: "Canada".into(),
            cities: vec!["Toronto".into(), "Ottawa".into()],
        }];

        let report = run_populate(
            &db,
            &places,
            &targets,
            &config(),
            &AtomicBool::new(false),
            &Progress::none(),
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            PopulateReport {
                added: 1,
                skipped: 2,
                failed: 1,
                stopped: false,
            }
        );

        let stored = db.universities().await.unwrap();
        assert_eq!(stored.len(), 2);
        let york = stored.iter().find(|r| r.name == "York University").unwrap();
        assert_eq!(york.source, RecordSource::Populated);
        assert!(!york.is_verified);
    }

    #[tokio::test]
    async fn stop_flag_ends_run() {
        let db = Db::in_memory();
        let mut searches = HashMap::new();
        searches.insert(
            "universities in Sydney, Australia".to_string(),
            vec![("p1", "University of Sydney")],
        );
        let targets = vec![PopulateTarget {
            country: "Australia".into(),
            cities: vec!["Sydney".into()],
        }];

        let report = run_populate(
            &db,
            &FakePlaces { searches },
            &targets,
            &config(),
            &AtomicBool::new(true),
            &Progress::none(),
        )
        .await
        .unwrap();

        assert!(report.stopped);
        assert_eq!(report.added, 0);
    }
}
