//! HTTP client wrapper for resumable downloads.
//!
//! This module provides the `HttpClient` struct which streams a URL into a
//! destination file, resuming from whatever is already on disk.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use futures_util::StreamExt;
use reqwest::header::{
    ACCEPT, CACHE_CONTROL, CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue, ORIGIN, PRAGMA,
    RANGE, REFERER,
};
use reqwest::{Client, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{
    CHUNK_BUFFER_SIZE, CONNECT_TIMEOUT_SECS, PLAYER_ACCEPT, PLAYER_USER_AGENT, READ_TIMEOUT_SECS,
};
use super::error::DownloadError;
use super::progress::{DownloadProgress, TransferMeter};

const ICY_METADATA: &str = "icy-metadata";

/// HTTP client for resumable streaming downloads.
///
/// Every request carries a media-player identity (User-Agent, Accept,
/// `Icy-MetaData`, no-cache) plus `Referer`/`Origin` headers. Create it once
/// and reuse it to benefit from connection pooling.
///
/// # Example
///
/// ```no_run
/// use m3u_organizer_core::download::HttpClient;
/// use tokio_util::sync::CancellationToken;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let cancel = CancellationToken::new();
/// let outcome = client
///     .download_one(
///         "http://panel.example/movie/u/p/1.mkv",
///         Path::new("./Films/Action/Heat.mkv"),
///         |p| println!("{}", p.status),
///         &cancel,
///     )
///     .await?;
/// println!("{} bytes", outcome.bytes_on_disk);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    origin_override: Option<String>,
}

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Destination path.
    pub path: PathBuf,
    /// File size after the transfer.
    pub bytes_on_disk: u64,
    /// Expected size when the server announced one.
    pub total_bytes: Option<u64>,
    /// Bytes already on disk when the transfer started (0 for a fresh file).
    pub resumed_from: u64,
    /// Whether the server ignored the range request and the file was rewritten.
    pub restarted: bool,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Request timeout: 24 hours
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            origin_override: None,
        }
    }

    /// Sends `origin` as `Origin` (and `origin/` as `Referer`) instead of
    /// the request URL's own origin.
    #[must_use]
    pub fn with_referer(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim().trim_end_matches('/').to_string();
        self.origin_override = (!origin.is_empty()).then_some(origin);
        self
    }

    /// Downloads `url` into `dest`, resuming from the bytes already on disk.
    ///
    /// `on_progress` receives a snapshot after every written chunk and a
    /// final snapshot at 100% with status [`DONE_STATUS`](super::DONE_STATUS).
    ///
    /// Range handling:
    /// - 206 appends to the existing bytes
    /// - 200 to a ranged request truncates the file and restarts at zero
    /// - 416 to a ranged request means the file is already complete
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is not an absolute http(s) URL
    /// - Another writer holds `dest` ([`DownloadError::Locked`])
    /// - The request fails (network error, timeout) or answers a non-success status
    /// - Writing to disk fails
    /// - `cancel` fires ([`DownloadError::Cancelled`]); bytes already written stay on disk
    #[instrument(skip(self, on_progress, cancel), fields(url = %url, dest = %dest.display()))]
    pub async fn download_one<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        F: FnMut(DownloadProgress),
    {
        let parsed = parse_http_url(url)?;
        if cancel.is_cancelled() {
            return Err(DownloadError::cancelled(url));
        }

        create_parent_dirs(dest).await?;
        let file = open_locked(dest).await?;
        let existing_bytes = file
            .metadata()
            .await
            .map_err(|e| DownloadError::io(dest, e))?
            .len();

        let result = self
            .transfer(&parsed, url, dest, file, existing_bytes, &mut on_progress, cancel)
            .await;
        if result.is_err() {
            discard_empty_file(dest).await;
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn transfer<F>(
        &self,
        parsed: &Url,
        url: &str,
        dest: &Path,
        mut file: File,
        existing_bytes: u64,
        on_progress: &mut F,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        F: FnMut(DownloadProgress),
    {
        let range = (existing_bytes > 0).then(|| format!("bytes={existing_bytes}-"));
        debug!(existing_bytes, "starting download");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            response = self.send_request(parsed, range.as_deref()) => response?,
        };
        let status = response.status();

        if existing_bytes > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE {
            info!(bytes = existing_bytes, "nothing left to download");
            let meter = TransferMeter::new(existing_bytes, Some(existing_bytes));
            on_progress(meter.finished(existing_bytes));
            return Ok(DownloadOutcome {
                path: dest.to_path_buf(),
                bytes_on_disk: existing_bytes,
                total_bytes: Some(existing_bytes),
                resumed_from: existing_bytes,
                restarted: false,
            });
        }

        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let mut start = existing_bytes;
        let mut restarted = false;
        if existing_bytes > 0 && status != StatusCode::PARTIAL_CONTENT {
            warn!(
                existing_bytes,
                status = status.as_u16(),
                "server ignored range request, restarting from zero"
            );
            file.set_len(0)
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            start = 0;
            restarted = true;
        }
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        let total_bytes = derive_total_content_length(&response, start);
        let meter = TransferMeter::new(start, total_bytes);
        let written = stream_to_file(
            file,
            response,
            StreamTarget {
                url,
                path: dest,
                start,
                meter: &meter,
            },
            on_progress,
            cancel,
        )
        .await?;

        on_progress(meter.finished(written));
        info!(
            path = %dest.display(),
            bytes = written,
            resumed_from = start,
            restarted,
            "download complete"
        );

        Ok(DownloadOutcome {
            path: dest.to_path_buf(),
            bytes_on_disk: written,
            total_bytes,
            resumed_from: start,
            restarted,
        })
    }

    /// Sends a GET with the identification headers and an optional `Range`.
    ///
    /// The status is not checked here; callers decide which codes they accept.
    pub(super) async fn send_request(
        &self,
        url: &Url,
        range_header: Option<&str>,
    ) -> Result<reqwest::Response, DownloadError> {
        let mut request = self
            .client
            .get(url.clone())
            .headers(self.identification_headers(url));
        if let Some(range) = range_header {
            request = request.header(RANGE, range);
        }

        request
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url.as_str(), e))
    }

    fn identification_headers(&self, url: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(PLAYER_ACCEPT));
        headers.insert(HeaderName::from_static(ICY_METADATA), HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        if let Some(origin) = self.origin_for(url) {
            match (
                HeaderValue::from_str(&format!("{origin}/")),
                HeaderValue::from_str(&origin),
            ) {
                (Ok(referer), Ok(origin)) => {
                    headers.insert(REFERER, referer);
                    headers.insert(ORIGIN, origin);
                }
                _ => debug!(origin = %origin, "origin is not a valid header value, omitting"),
            }
        }
        headers
    }

    fn origin_for(&self, url: &Url) -> Option<String> {
        if let Some(origin) = &self.origin_override {
            return Some(origin.clone());
        }
        let origin = url.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

/// Where a response body is being written.
pub(super) struct StreamTarget<'a> {
    pub(super) url: &'a str,
    pub(super) path: &'a Path,
    pub(super) start: u64,
    pub(super) meter: &'a TransferMeter,
}

/// Streams a response body into `file`, returning the file size afterwards.
///
/// Each chunk is flushed before its progress snapshot is reported, so an
/// interrupted transfer always leaves a valid resume point.
pub(super) async fn stream_to_file<F>(
    file: File,
    response: reqwest::Response,
    target: StreamTarget<'_>,
    on_progress: &mut F,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError>
where
    F: FnMut(DownloadProgress),
{
    let StreamTarget {
        url,
        path,
        start,
        meter,
    } = target;
    let mut writer = BufWriter::with_capacity(CHUNK_BUFFER_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut downloaded = start;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                writer.flush().await.map_err(|e| DownloadError::io(path, e))?;
                debug!(downloaded, "transfer cancelled");
                return Err(DownloadError::cancelled(url));
            }
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        writer.flush().await.map_err(|e| DownloadError::io(path, e))?;

        downloaded += chunk.len() as u64;
        on_progress(meter.snapshot(downloaded));
    }

    writer.flush().await.map_err(|e| DownloadError::io(path, e))?;
    Ok(downloaded)
}

/// Opens `path` for writing under an exclusive advisory lock.
///
/// The file is created if missing and never truncated here.
pub(super) async fn open_locked(path: &Path) -> Result<File, DownloadError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    let std_file = file.into_std().await;
    match FileExt::try_lock_exclusive(&std_file) {
        Ok(()) => Ok(File::from_std(std_file)),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            Err(DownloadError::locked(path))
        }
        Err(e) => Err(DownloadError::io(path, e)),
    }
}

// A file left empty by a failed transfer (never written, or truncated for a
// restart) would otherwise show up as already present in the library index.
async fn discard_empty_file(path: &Path) {
    let is_empty = tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.len() == 0);
    if is_empty && let Err(error) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), %error, "could not remove empty file");
    }
}

pub(super) async fn create_parent_dirs(path: &Path) -> Result<(), DownloadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }
    Ok(())
}

pub(super) fn parse_http_url(url: &str) -> Result<Url, DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(url));
    }
    Ok(parsed)
}

fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(PLAYER_USER_AGENT)
        .build()
}

/// Expected final size: `Content-Length` plus the resume offset for a 206.
pub(super) fn derive_total_content_length(
    response: &reqwest::Response,
    existing_bytes: u64,
) -> Option<u64> {
    let current = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if response.status() == StatusCode::PARTIAL_CONTENT {
        current.map(|remaining| existing_bytes.saturating_add(remaining))
    } else {
        current
    }
}
