//! Per-transfer progress snapshots and the human-readable status line.

use std::time::Instant;

use serde::Serialize;

/// Status text of the final snapshot of a successful transfer.
pub const DONE_STATUS: &str = "Done";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Point-in-time progress of one transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadProgress {
    /// Bytes on disk, including bytes present before a resume.
    pub downloaded_bytes: u64,
    /// Expected final size, 0 when unknown.
    pub total_bytes: u64,
    /// Bytes transferred in this session divided by elapsed seconds.
    pub speed_bytes_per_sec: f64,
    /// 0 when the total is unknown; one decimal, at most 100.
    pub percent: f64,
    /// Status line suitable for display.
    pub status: String,
}

impl DownloadProgress {
    /// Returns true when this is a completion snapshot.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == DONE_STATUS
    }
}

/// Computes snapshots for one transfer session.
#[derive(Debug)]
pub(crate) struct TransferMeter {
    started: Instant,
    session_start_bytes: u64,
    total_bytes: u64,
}

impl TransferMeter {
    pub(crate) fn new(session_start_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            session_start_bytes,
            total_bytes: total_bytes.unwrap_or(0),
        }
    }

    pub(crate) fn snapshot(&self, downloaded_bytes: u64) -> DownloadProgress {
        let elapsed = self.started.elapsed().as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let session_bytes = downloaded_bytes.saturating_sub(self.session_start_bytes) as f64;
        let speed = if elapsed > 0.0 {
            session_bytes / elapsed
        } else {
            0.0
        };
        let percent = percent_of(downloaded_bytes, self.total_bytes);

        DownloadProgress {
            downloaded_bytes,
            total_bytes: self.total_bytes,
            speed_bytes_per_sec: speed,
            percent,
            status: format_status(downloaded_bytes, self.total_bytes, speed, percent),
        }
    }

    pub(crate) fn finished(&self, downloaded_bytes: u64) -> DownloadProgress {
        let mut progress = self.snapshot(downloaded_bytes);
        if progress.total_bytes == 0 {
            progress.total_bytes = downloaded_bytes;
        }
        progress.percent = 100.0;
        progress.status = DONE_STATUS.to_string();
        progress
    }
}

/// Percent of `total` reached, rounded to one decimal and capped at 100.
#[must_use]
pub fn percent_of(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = downloaded as f64 * 100.0 / total as f64;
    ((raw * 10.0).round() / 10.0).min(100.0)
}

/// Formats the status line shown while a transfer runs.
///
/// `"512.00 MB | 4.20 MB/s | 50.0% | 2m03s"` with a known total,
/// `"512.00 MB | 4.20 MB/s | size ? | ???"` without.
#[must_use]
pub fn format_status(downloaded: u64, total: u64, speed_bytes_per_sec: f64, percent: f64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mb = downloaded as f64 / BYTES_PER_MB;
    let mb_per_sec = speed_bytes_per_sec / BYTES_PER_MB;

    if total == 0 {
        return format!("{mb:.2} MB | {mb_per_sec:.2} MB/s | size ? | ???");
    }

    let eta = format_eta(total.saturating_sub(downloaded), speed_bytes_per_sec);
    format!("{mb:.2} MB | {mb_per_sec:.2} MB/s | {percent:.1}% | {eta}")
}

fn format_eta(remaining_bytes: u64, speed_bytes_per_sec: f64) -> String {
    if !speed_bytes_per_sec.is_finite() || speed_bytes_per_sec <= 0.0 {
        return "???".to_string();
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let secs = (remaining_bytes as f64 / speed_bytes_per_sec).round() as u64;
    format!("{}m{:02}s", secs / 60, secs % 60)
}
