//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so that batch status
//! lines and logs can be read without extra context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during file downloads and playlist retrieval.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Another writer holds the destination file.
    #[error("{path} is locked by another download")]
    Locked {
        /// The locked destination.
        path: PathBuf,
    },

    /// The cancellation token fired.
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The URL being transferred.
        url: String,
    },

    /// A fetched playlist is too small to be genuine.
    #[error("playlist at {path} is only {bytes} bytes (minimum {minimum})")]
    PlaylistTooSmall {
        /// Where the playlist was written.
        path: PathBuf,
        /// Size actually written.
        bytes: u64,
        /// Minimum accepted size.
        minimum: u64,
    },

    /// Every attempt failed; `source` is the last error.
    #[error("failed to fetch {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The playlist URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: Box<DownloadError>,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Maps a reqwest error, promoting timeouts to [`DownloadError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a lock contention error.
    pub fn locked(path: impl Into<PathBuf>) -> Self {
        Self::Locked { path: path.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a too-small playlist error.
    pub fn playlist_too_small(path: impl Into<PathBuf>, bytes: u64, minimum: u64) -> Self {
        Self::PlaylistTooSmall {
            path: path.into(),
            bytes,
            minimum,
        }
    }

    /// Wraps the last attempt's error once retries are used up.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last: DownloadError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns true for [`DownloadError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the
// url or path, which the source errors do not carry.
