//! Constants for the download module (timeouts, buffers, request identity).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP request timeout (24 hours, long enough for multi-GB files).
pub const READ_TIMEOUT_SECS: u64 = 86_400;

/// Write buffer in front of the destination file (2 MiB).
pub const CHUNK_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// A fetched playlist smaller than this is treated as an error page.
pub const MIN_PLAYLIST_BYTES: u64 = 100;

/// Default number of playlist fetch attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed wait between playlist fetch attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// User-Agent sent on every request. IPTV panels commonly whitelist player agents.
pub const PLAYER_USER_AGENT: &str = "ExoPlayer/2.19.1";

/// Accept header sent on every request.
pub const PLAYER_ACCEPT: &str = "application/vnd.apple.mpegurl, */*";
