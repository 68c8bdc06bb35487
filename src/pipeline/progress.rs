// src/pipeline/progress.rs

//! Progress events published by batch jobs.

use std::fmt;

use tokio::sync::mpsc;

/// Batch job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Populate,
    ScrapePathways,
    ConvertCgpa,
    Dedupe,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Populate => "populate",
            Job::ScrapePathways => "scrape-pathways",
            Job::ConvertCgpa => "convert-cgpa",
            Job::Dedupe => "dedupe",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `total` is `None` when the item count is not known up front
    Started { job: Job, total: Option<usize> },
    Item {
        job: Job,
        index: usize,
        label: String,
        outcome: ItemOutcome,
    },
    Finished {
        job: Job,
        processed: usize,
        stopped: bool,
    },
}

/// Sending half handed to jobs. Sends never block and never fail the job.
#[derive(Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Progress {
    /// A progress handle and the receiver to subscribe with.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Handle that drops every event.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn started(&self, job: Job, total: Option<usize>) {
        self.emit(ProgressEvent::Started { job, total });
    }

    pub fn item(&self, job: Job, index: usize, label: impl Into<String>, outcome: ItemOutcome) {
        self.emit(ProgressEvent::Item {
            job,
            index,
            label: label.into(),
            outcome,
        });
    }

    pub fn finished(&self, job: Job, processed: usize, stopped: bool) {
        self.emit(ProgressEvent::Finished {
            job,
            processed,
            stopped,
        });
    }
}

/// Log every event until all senders are gone.
pub async fn log_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Started { job, total } => match total {
                Some(n) => log::info!("[{}] started, {} items", job, n),
                None => log::info!("[{}] started", job),
            },
            ProgressEvent::Item {
                job,
                index,
                label,
                outcome,
            } => match outcome {
                ItemOutcome::Done => log::info!("[{}] #{} {}", job, index + 1, label),
                ItemOutcome::Skipped(why) => {
                    log::debug!("[{}] #{} {} skipped: {}", job, index + 1, label, why)
                }
                ItemOutcome::Failed(why) => {
                    log::warn!("[{}] #{} {} failed: {}", job, index + 1, label, why)
                }
            },
            ProgressEvent::Finished {
                job,
                processed,
                stopped,
            } => {
                if stopped {
                    log::warn!("[{}] stopped after {} items", job, processed);
                } else {
                    log::info!("[{}] finished, {} items", job, processed);
                }
            }
        }
    }
}
