//! The main worker loop: claim, fetch, filter, archive, upload.
//!
//! One sequential unit of work at a time; horizontal scaling comes from
//! running more worker processes against the same work source. The stop
//! signal is polled only between units of work, so an in-flight clone or
//! upload always completes (or fails) before shutdown.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::archiver::Archiver;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::retry::RetryPolicy;
use crate::source::Source;
use crate::uploader::Uploader;

/// Cooperative stop-check capability, polled before each unit of work.
pub type StopCheck = Box<dyn Fn() -> bool + Send>;

/// Stop check backed by the presence of a marker file.
pub fn stop_file_check(path: impl Into<PathBuf>) -> StopCheck {
    let path = path.into();
    Box::new(move || path.exists())
}

/// Stop check that never fires.
pub fn never_stop() -> StopCheck {
    Box::new(|| false)
}

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Work items obtained from the source.
    pub claimed: u64,
    /// Repositories archived (and handed to the uploader).
    pub archived: u64,
    /// Ids the API reported as not found.
    pub not_found: u64,
    /// Ids the API refused to serve.
    pub blocked: u64,
    /// Forks deferred for later processing.
    pub unwanted: u64,
}

/// Sequential pipeline over injected capabilities.
pub struct Worker {
    source: Box<dyn Source>,
    fetcher: Box<dyn Fetcher>,
    archiver: Box<dyn Archiver>,
    uploader: Box<dyn Uploader>,
    stop: StopCheck,
    retry: RetryPolicy,
}

impl Worker {
    pub fn new(
        source: Box<dyn Source>,
        fetcher: Box<dyn Fetcher>,
        archiver: Box<dyn Archiver>,
        uploader: Box<dyn Uploader>,
        stop: StopCheck,
    ) -> Self {
        Self {
            source,
            fetcher,
            archiver,
            uploader,
            stop,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy shared by the fetch and archive steps.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs until the source is exhausted, the stop check fires, or a
    /// fatal error occurs.
    ///
    /// Connection failures during fetch and any archive failure are
    /// retried under the shared budget; not-found, blocked, and fork
    /// items are skipped; everything else is fatal and propagates.
    pub async fn run(&mut self) -> anyhow::Result<WorkerSummary> {
        let mut summary = WorkerSummary::default();
        info!(uploader = self.uploader.name(), "Worker starting");

        loop {
            if (self.stop)() {
                info!("Stop marker present, shutting down");
                break;
            }

            let Some(item) = self
                .source
                .next()
                .await
                .context("failed to obtain next work item")?
            else {
                info!("Work source exhausted, finished");
                break;
            };
            summary.claimed += 1;
            info!(repo_id = item.repo_id, "Claimed repository");

            let fetched = self
                .retry
                .run(
                    || self.fetcher.fetch(item.repo_id, item.api_token.as_deref()),
                    FetchError::is_connection,
                )
                .await;
            let metadata = match fetched {
                Ok(metadata) => metadata,
                Err(FetchError::NotFound) => {
                    summary.not_found += 1;
                    info!(repo_id = item.repo_id, "Repository not found (404), skipping");
                    continue;
                }
                Err(FetchError::AccessBlocked) => {
                    summary.blocked += 1;
                    info!(
                        repo_id = item.repo_id,
                        "Repository access blocked (403), skipping"
                    );
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("fatal metadata error for repository {}", item.repo_id)
                    });
                }
            };

            // Forks are deferred for later processing.
            if metadata.fork() {
                summary.unwanted += 1;
                info!(
                    repo_id = item.repo_id,
                    full_name = metadata.full_name(),
                    "Unwanted fork, skipping"
                );
                continue;
            }

            info!(
                repo_id = item.repo_id,
                full_name = metadata.full_name(),
                "Mirror clone starting"
            );
            // The destroy+clone sequence retries as a unit; the archiver's
            // idempotent cleanup makes that safe.
            let directory = self
                .retry
                .run(|| self.archiver.archive(&metadata), |_| true)
                .await
                .with_context(|| {
                    format!("failed to archive repository {}", item.repo_id)
                })?;

            info!(
                repo_id = item.repo_id,
                directory = %directory.display(),
                "Upload starting"
            );
            // Not retried: a partial upload of history is unsafe to redo
            // silently.
            self.uploader
                .upload(&directory)
                .await
                .with_context(|| {
                    format!("failed to upload repository {}", item.repo_id)
                })?;

            summary.archived += 1;
            info!(repo_id = item.repo_id, "Done");
        }

        Ok(summary)
    }
}
