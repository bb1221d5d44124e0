//! Sequential batch downloads over selected catalog entries.
//!
//! Entries are processed one at a time with a pause between files. A failed
//! entry is recorded and the batch moves on; cancellation stops the batch.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::download::{DownloadProgress, HttpClient};
use crate::library::{Catalog, EntryStatus, plan_target_path};
use crate::playlist::EntryId;

/// Default pause between two files of a batch.
pub const DEFAULT_DELAY_BETWEEN_FILES: Duration = Duration::from_secs(15);

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// An entry is about to be downloaded.
    EntryStarted {
        /// Entry being downloaded.
        id: EntryId,
        /// Its title.
        title: String,
        /// 1-based position in the batch.
        position: usize,
        /// Number of entries in the batch.
        total: usize,
    },
    /// Progress of the current file.
    File {
        /// Entry being downloaded.
        id: EntryId,
        /// Latest snapshot.
        progress: DownloadProgress,
    },
    /// An entry reached a final status.
    EntryFinished {
        /// Entry that finished.
        id: EntryId,
        /// Its final status.
        status: EntryStatus,
    },
    /// Overall batch progress after an entry finished.
    Batch {
        /// Entries processed so far.
        done: usize,
        /// Entries in the batch.
        total: usize,
        /// `done / total` as a rounded percentage.
        percent: u8,
    },
}

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Entries downloaded successfully.
    pub completed: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Selected ids that were unknown or not downloadable.
    pub skipped: usize,
    /// Whether the batch stopped because of cancellation.
    pub cancelled: bool,
}

/// Runs selected downloads one after another.
#[derive(Debug, Clone)]
pub struct BatchDownloader {
    client: HttpClient,
    delay: Duration,
}

impl BatchDownloader {
    /// Creates a batch runner with [`DEFAULT_DELAY_BETWEEN_FILES`].
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            delay: DEFAULT_DELAY_BETWEEN_FILES,
        }
    }

    /// Overrides the pause between files (zero disables it).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Downloads the selected movies and episodes into `root`.
    ///
    /// Each entry moves through `Preparing`, `Downloading` and then
    /// `Completed`, `Failed` or `Cancelled` in the catalog. Completed entries
    /// are added to the catalog's index. The pause is skipped after the last
    /// entry and is cut short by `cancel`.
    #[instrument(skip_all, fields(selected = selection.len(), root = %root.display()))]
    pub async fn run<F>(
        &self,
        catalog: &mut Catalog,
        selection: &[EntryId],
        root: &Path,
        mut on_event: F,
        cancel: &CancellationToken,
    ) -> BatchSummary
    where
        F: FnMut(BatchEvent),
    {
        let mut summary = BatchSummary::default();

        let jobs: Vec<EntryId> = selection
            .iter()
            .copied()
            .filter(|id| {
                let downloadable = catalog
                    .entry(*id)
                    .is_some_and(|entry| entry.media_type.is_downloadable());
                if !downloadable {
                    debug!(%id, "skipping entry that cannot be downloaded");
                    summary.skipped += 1;
                }
                downloadable
            })
            .collect();

        let total = jobs.len();
        info!(total, skipped = summary.skipped, "starting batch");

        for (i, &id) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some(entry) = catalog.entry(id) else {
                continue;
            };
            let title = entry.title.clone();
            let url = entry.source_url.clone();
            let target = catalog
                .state(id)
                .and_then(|state| state.target_path.clone())
                .unwrap_or_else(|| plan_target_path(entry, root));

            set_status(catalog, id, EntryStatus::Preparing);
            on_event(BatchEvent::EntryStarted {
                id,
                title,
                position: i + 1,
                total,
            });

            let result = self
                .client
                .download_one(
                    &url,
                    &target,
                    |progress| {
                        set_status(
                            catalog,
                            id,
                            EntryStatus::Downloading(progress.status.clone()),
                        );
                        on_event(BatchEvent::File { id, progress });
                    },
                    cancel,
                )
                .await;

            let status = match result {
                Ok(outcome) => {
                    catalog.mark_completed(id, &outcome.path);
                    summary.completed += 1;
                    EntryStatus::Completed
                }
                Err(error) if error.is_cancelled() => {
                    summary.cancelled = true;
                    EntryStatus::Cancelled
                }
                Err(error) => {
                    warn!(%id, error = %error, "download failed");
                    summary.failed += 1;
                    EntryStatus::Failed(error.to_string())
                }
            };
            set_status(catalog, id, status.clone());
            on_event(BatchEvent::EntryFinished { id, status });

            if summary.cancelled {
                break;
            }

            let done = i + 1;
            on_event(BatchEvent::Batch {
                done,
                total,
                percent: batch_percent(done, total),
            });

            if !self.delay.is_zero() && done < total {
                debug!(delay_secs = self.delay.as_secs(), "waiting before next file");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        summary.cancelled = true;
                        break;
                    }
                    () = tokio::time::sleep(self.delay) => {}
                }
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "batch finished"
        );
        summary
    }
}

fn set_status(catalog: &mut Catalog, id: EntryId, status: EntryStatus) {
    if let Some(state) = catalog.state_mut(id) {
        state.status = status;
    }
}

fn batch_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let percent = (done as f64 / total as f64 * 100.0).round().min(100.0) as u8;
    percent
}
