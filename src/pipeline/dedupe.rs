// src/pipeline/dedupe.rs

//! Duplicate university cleanup.

use crate::error::Result;
use crate::pipeline::progress::{ItemOutcome, Job, Progress};
use crate::services::duplicates::group_duplicates;
use crate::storage::Db;
use crate::utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub groups: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Remove every duplicate but the most complete record of each group.
///
/// With `dry_run` the groups are reported and nothing is deleted.
pub async fn run_dedupe(db: &Db, dry_run: bool, progress: &Progress) -> Result<DedupeReport> {
    let records = db.universities().await?;
    let groups = group_duplicates(&records);
    let mut report = DedupeReport {
        groups: groups.len(),
        ..DedupeReport::default()
    };

    utils::log::header(if dry_run {
        "Finding duplicate universities (dry run)"
    } else {
        "Removing duplicate universities"
    });
    progress.started(Job::Dedupe, Some(groups.len()));

    for (index, group) in groups.iter().enumerate() {
        utils::log::step(
            index + 1,
            groups.len(),
            &format!("{} ({}, {})", group.keep.name, group.keep.city, group.keep.country),
        );
        let mut failures = Vec::new();
        for dup in &group.remove {
            utils::log::sub_item(&format!("{} [{}]", dup.name, dup.id));
            if dry_run {
                continue;
            }
            match db.delete_university(&dup.id).await {
                Ok(_) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    failures.push(format!("{}: {e}", dup.id));
                }
            }
        }

        let outcome = if dry_run {
            ItemOutcome::Skipped(format!("{} duplicates (dry run)", group.remove.len()))
        } else if failures.is_empty() {
            ItemOutcome::Done
        } else {
            ItemOutcome::Failed(failures.join("; "))
        };
        progress.item(Job::Dedupe, index, &group.keep.name, outcome);
    }

    progress.finished(Job::Dedupe, groups.len(), false);
    utils::log::separator();
    utils::log::summary(
        "Dedupe Results",
        &[
            ("groups", report.groups.to_string()),
            ("removed", report.removed.to_string()),
            ("failed", report.failed.to_string()),
            ("dry run", dry_run.to_string()),
        ],
    );
    Ok(report)
}
