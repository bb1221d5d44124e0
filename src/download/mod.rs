//! HTTP download engine for streaming files to disk.
//!
//! This module provides resumable single-file downloads and playlist
//! retrieval with retries.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for multi-GB files)
//! - Resume from the bytes already on disk via `Range` requests
//! - Exclusive advisory lock on the destination while writing
//! - Cooperative cancellation through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use m3u_organizer_core::download::{HttpClient, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let cancel = CancellationToken::new();
//! client
//!     .fetch_playlist(
//!         "http://panel.example/get.php?username=u&password=p&type=m3u_plus",
//!         Path::new("./playlist.m3u"),
//!         &RetryPolicy::default(),
//!         |_| {},
//!         &cancel,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod progress;
mod remote;
mod retry;

pub use client::{DownloadOutcome, HttpClient};
pub use error::DownloadError;
pub use progress::{DONE_STATUS, DownloadProgress, format_status, percent_of};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};

