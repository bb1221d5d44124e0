//! Playlist source resolution: local path or remote URL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use m3u_organizer_core::{CancellationToken, HttpClient, RetryPolicy};
use tempfile::TempDir;
use tracing::info;

use crate::app::progress::FetchBar;

const REMOTE_FILE_NAME: &str = "playlist.m3u";

/// A playlist file ready to parse. Remote playlists live in a scratch
/// directory removed when this value is dropped.
#[derive(Debug)]
pub(crate) struct PlaylistSource {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl PlaylistSource {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolves `source`, fetching it first when it is an http(s) URL.
pub(crate) async fn resolve_source(
    source: &str,
    client: &HttpClient,
    show_progress: bool,
    cancel: &CancellationToken,
) -> Result<PlaylistSource> {
    if !is_remote(source) {
        return Ok(PlaylistSource {
            path: PathBuf::from(source),
            _scratch: None,
        });
    }

    let scratch = TempDir::new().context("Failed to create a scratch directory")?;
    let dest = scratch.path().join(REMOTE_FILE_NAME);
    let bar = FetchBar::new(show_progress);
    let result = client
        .fetch_playlist(
            source.trim(),
            &dest,
            &RetryPolicy::default(),
            |progress| bar.update(&progress),
            cancel,
        )
        .await;
    bar.finish();
    let outcome = result.with_context(|| format!("Failed to fetch playlist from {source}"))?;
    info!(bytes = outcome.bytes_on_disk, "remote playlist ready");

    Ok(PlaylistSource {
        path: dest,
        _scratch: Some(scratch),
    })
}
