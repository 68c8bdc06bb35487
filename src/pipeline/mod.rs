//! Batch jobs run from the command line.
//!
//! - `run_populate`: Insert universities found through Places searches
//! - `run_scrape`: Pre-generate pathway templates over a profile matrix
//! - `run_convert_cgpa`: Move stored CGPA thresholds to the 10-point scale
//! - `run_dedupe`: Remove duplicate universities
//!
//! Every job reports through a [`Progress`] handle and can be watched with
//! [`log_progress`].

pub mod dedupe;
pub mod migrate;
pub mod populate;
pub mod progress;
pub mod scrape;

pub use dedupe::{DedupeReport, run_dedupe};
pub use migrate::{MigrationReport, run_convert_cgpa};
pub use populate::{PopulateReport, run_populate};
pub use progress::{ItemOutcome, Job, Progress, ProgressEvent, log_progress};
pub use scrape::{ScrapeReport, combinations, run_scrape};
