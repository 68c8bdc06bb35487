// src/pipeline/migrate.rs

//! CGPA threshold conversion over the stored universities.

use serde_json::Value;

use crate::error::Result;
use crate::models::{UNIVERSITY_SCHEMA_VERSION, migrate_university};
use crate::pipeline::progress::{ItemOutcome, Job, Progress};
use crate::services::cgpa::{convert_cgpa, is_four_point};
use crate::storage::Db;
use crate::utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Rewrite every university whose document is behind the current schema or
/// still holds a 4-point `min_cgpa`.
pub async fn run_convert_cgpa(db: &Db, progress: &Progress) -> Result<MigrationReport> {
    let docs = db.raw_universities().await?;
    let mut report = MigrationReport::default();

    utils::log::header("Converting CGPA thresholds");
    progress.started(Job::ConvertCgpa, Some(docs.len()));

    for (index, doc) in docs.into_iter().enumerate() {
        let label = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        let version = doc
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let outcome = match migrate_university(doc) {
            Ok(mut record) => {
                let stale_scale = record.admission.min_cgpa.is_some_and(is_four_point);
                if version >= UNIVERSITY_SCHEMA_VERSION as u64 && !stale_scale {
                    report.skipped += 1;
                    ItemOutcome::Skipped("already on the 10-point scale".into())
                } else {
                    let converted = match record.admission.min_cgpa {
                        Some(cgpa) if stale_scale => convert_cgpa(cgpa).map(Some),
                        other => Ok(other),
                    };
                    match converted {
                        Ok(cgpa) => {
                            record.admission.min_cgpa = cgpa;
                            record.schema_version = UNIVERSITY_SCHEMA_VERSION;
                            match db.save_university(&record).await {
                                Ok(()) => {
                                    report.converted += 1;
                                    ItemOutcome::Done
                                }
                                Err(e) => {
                                    report.failed += 1;
                                    ItemOutcome::Failed(e.to_string())
                                }
                            }
                        }
                        Err(e) => {
                            report.failed += 1;
                            ItemOutcome::Failed(e.to_string())
                        }
                    }
                }
            }
            Err(e) => {
                report.failed += 1;
                ItemOutcome::Failed(e.to_string())
            }
        };
        progress.item(Job::ConvertCgpa, index, label, outcome);
    }

    progress.finished(
        Job::ConvertCgpa,
        report.converted + report.skipped + report.failed,
        false,
    );
    utils::log::summary(
        "CGPA Conversion Results",
        &[
            ("converted", report.converted.to_string()),
            ("skipped", report.skipped.to_string()),
            ("failed", report.failed.to_string()),
        ],
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_university;
    use crate::storage::{Collection, DocumentStore, MemoryStorage};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn converts_legacy_and_four_point_records() {
        let store = Arc::new(MemoryStorage::new());
        let db = Db::new(store.clone());

        // v0 document with a 4-point threshold
        store
            .put(
                Collection::Universities,
                "legacy",
                json!({
                    "id": "legacy",
                    "name": "Old Record",
                    "country": "USA",
                    "admission": { "min_cgpa": 3.2 },
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();

        // current schema, but still 4-point
        let mut four_point = sample_university("Four Point", "Austin", "USA");
        four_point.admission.min_cgpa = Some(3.6);
        db.save_university(&four_point).await.unwrap();

        // already fine
        let mut fine = sample_university("Ten Point", "Austin", "USA");
        fine.admission.min_cgpa = Some(8.5);
        db.save_university(&fine).await.unwrap();

        // unreadable
        store
            .put(Collection::Universities, "broken", json!({ "id": "broken" }))
            .await
            .unwrap();

        let report = run_convert_cgpa(&db, &Progress::none()).await.unwrap();
        assert_eq!(
            report,
            MigrationReport {
                converted: 2,
                skipped: 1,
                failed: 1,
            }
        );

        let legacy = db.university("legacy").await.unwrap().unwrap();
        assert_eq!(legacy.admission.min_cgpa, Some(8.0));
        let raw = store.get(Collection::Universities, "legacy").await.unwrap().unwrap();
        assert_eq!(raw["schema_version"], 1);

        let four_point = db.university(&four_point.id).await.unwrap().unwrap();
        assert_eq!(four_point.admission.min_cgpa, Some(9.0));

        // second run has nothing left to do
        let again = run_convert_cgpa(&db, &Progress::none()).await.unwrap();
        assert_eq!(again.converted, 0);
        assert_eq!(again.skipped, 3);
    }
}
