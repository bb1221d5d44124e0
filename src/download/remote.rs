//! Remote playlist retrieval with a fixed-delay retry loop.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{
    DownloadOutcome, HttpClient, StreamTarget, create_parent_dirs, derive_total_content_length,
    open_locked, parse_http_url, stream_to_file,
};
use super::constants::MIN_PLAYLIST_BYTES;
use super::error::DownloadError;
use super::progress::{DownloadProgress, TransferMeter};
use super::retry::{RetryDecision, RetryPolicy, classify_error};

impl HttpClient {
    /// Fetches a playlist into `dest`, retrying per `policy`.
    ///
    /// Every attempt rewrites `dest` from scratch. A body smaller than
    /// [`MIN_PLAYLIST_BYTES`] counts as a failed attempt. The pause between
    /// attempts is cut short by `cancel`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] before any request is made
    /// - [`DownloadError::Cancelled`] if `cancel` fires
    /// - [`DownloadError::RetriesExhausted`] once the attempt budget is spent,
    ///   with the last attempt's error as its source
    #[instrument(skip(self, policy, on_progress, cancel), fields(url = %url, dest = %dest.display()))]
    pub async fn fetch_playlist<F>(
        &self,
        url: &str,
        dest: &Path,
        policy: &RetryPolicy,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        F: FnMut(DownloadProgress),
    {
        parse_http_url(url)?;

        let mut attempt = 1;
        loop {
            let error = match self.fetch_once(url, dest, &mut on_progress, cancel).await {
                Ok(outcome) => {
                    info!(attempt, bytes = outcome.bytes_on_disk, "playlist fetched");
                    return Ok(outcome);
                }
                Err(error) => error,
            };

            match policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "playlist fetch failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    if error.is_cancelled() {
                        return Err(error);
                    }
                    warn!(attempt, reason = %reason, error = %error, "giving up on playlist fetch");
                    return Err(DownloadError::retries_exhausted(url, attempt, error));
                }
            }
        }
    }

    async fn fetch_once<F>(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut F,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        F: FnMut(DownloadProgress),
    {
        let parsed = parse_http_url(url)?;
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url));
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            response = self.send_request(&parsed, None) => response?,
        };
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        create_parent_dirs(dest).await?;
        let file = open_locked(dest).await?;
        file.set_len(0)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        let total_bytes = derive_total_content_length(&response, 0);
        let meter = TransferMeter::new(0, total_bytes);
        let written = stream_to_file(
            file,
            response,
            StreamTarget {
                url,
                path: dest,
                start: 0,
                meter: &meter,
            },
            on_progress,
            cancel,
        )
        .await?;

        if written < MIN_PLAYLIST_BYTES {
            debug!(bytes = written, "playlist body too small");
            return Err(DownloadError::playlist_too_small(
                dest,
                written,
                MIN_PLAYLIST_BYTES,
            ));
        }

        on_progress(meter.finished(written));
        Ok(DownloadOutcome {
            path: dest.to_path_buf(),
            bytes_on_disk: written,
            total_bytes,
            resumed_from: 0,
            restarted: false,
        })
    }
}
