//! Streaming playlist parser.
//!
//! Reads an IPTV playlist (`#EXTINF` metadata line followed by a URL line),
//! detects its text encoding, classifies each entry and returns the entries
//! that survive filtering, in file order.
//!
//! # Example
//!
//! ```no_run
//! use m3u_organizer_core::playlist::parse_playlist;
//! use tokio_util::sync::CancellationToken;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let entries = parse_playlist(Path::new("tv.m3u"), |p| println!("{}%", p.percent), &cancel).await?;
//! println!("{} entries", entries.len());
//! # Ok(())
//! # }
//! ```

mod classify;
mod encoding;
mod entry;
mod error;
mod extinf;

pub use classify::{
    ClassifierRules, DEFAULT_EXCLUDED_GROUP_PREFIXES, DEFAULT_LIVE_GROUPS, MediaType,
    SeasonEpisode, extension_from_url, season_episode, series_name,
};
pub use encoding::{DETECTION_PREFIX_LEN, DetectedEncoding, detect_encoding};
pub use entry::{EntryId, PlaylistEntry};
pub use error::ParseError;
pub use extinf::{ExtInf, UNTITLED, is_extinf, parse_extinf};

use std::borrow::Cow;
use std::io::SeekFrom;
use std::path::Path;
use std::time::{Duration, Instant};

use encoding_rs::{CoderResult, Decoder};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

/// Size of each read from the playlist file.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Minimum interval between intermediate progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Point-in-time parse progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseProgress {
    /// Percent of the file consumed (0-100, never decreasing within a run).
    pub percent: u8,
    /// Bytes read from the file so far.
    pub bytes_read: u64,
    /// File size in bytes.
    pub total_bytes: u64,
    /// Entries emitted so far.
    pub entries: usize,
}

/// Parses a playlist with the default [`ClassifierRules`].
///
/// # Errors
///
/// See [`parse_playlist_with_rules`].
pub async fn parse_playlist<F>(
    path: &Path,
    on_progress: F,
    cancel: &CancellationToken,
) -> Result<Vec<PlaylistEntry>, ParseError>
where
    F: FnMut(ParseProgress),
{
    parse_playlist_with_rules(path, &ClassifierRules::default(), on_progress, cancel).await
}

/// Parses a playlist file into classified entries.
///
/// `on_progress` is called synchronously: once at 0%, whenever the percent
/// advances or [`PROGRESS_INTERVAL`] passes while reading, and once at 100%
/// with exact totals. Lines may end in `\n`, `\r\n` or a lone `\r`.
/// The token is checked before every read and every line.
///
/// # Errors
///
/// - [`ParseError::NotFound`] if `path` does not exist
/// - [`ParseError::Io`] if the file cannot be read
/// - [`ParseError::Cancelled`] if `cancel` fires before parsing completes
#[instrument(skip(rules, on_progress, cancel), fields(path = %path.display()))]
pub async fn parse_playlist_with_rules<F>(
    path: &Path,
    rules: &ClassifierRules,
    mut on_progress: F,
    cancel: &CancellationToken,
) -> Result<Vec<PlaylistEntry>, ParseError>
where
    F: FnMut(ParseProgress),
{
    let io_err = |e| ParseError::io(path, e);

    let file_len = tokio::fs::metadata(path).await.map_err(io_err)?.len();
    let mut file = File::open(path).await.map_err(io_err)?;

    let mut head = vec![0u8; DETECTION_PREFIX_LEN];
    let head_len = read_prefix(&mut file, &mut head).await.map_err(io_err)?;
    let detected = detect_encoding(&head[..head_len]);
    debug!(
        encoding = detected.encoding.name(),
        bom_len = detected.bom_len,
        "detected playlist encoding"
    );

    let mut offset = detected.bom_len as u64;
    file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;

    let mut decoder = detected.encoding.new_decoder_without_bom_handling();
    let mut collector = EntryCollector::new(rules);
    let mut tracker = ProgressTracker::new(file_len);

    on_progress(tracker.start());

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut text = String::new();
    loop {
        if cancel.is_cancelled() {
            debug!(offset, "playlist parsing cancelled");
            return Err(ParseError::Cancelled);
        }

        let read = file.read(&mut buf).await.map_err(io_err)?;
        let last = read == 0;
        decode_chunk(&mut decoder, &buf[..read], &mut text, last);
        offset += read as u64;

        let mut consumed = 0;
        while let Some((len, terminator)) = next_line(&text[consumed..], last) {
            if cancel.is_cancelled() {
                debug!(offset, "playlist parsing cancelled");
                return Err(ParseError::Cancelled);
            }
            collector.push_line(&text[consumed..consumed + len]);
            consumed += len + terminator;
            if let Some(progress) = tracker.tick(offset, collector.len()) {
                on_progress(progress);
            }
        }
        text.drain(..consumed);

        if last {
            if !text.is_empty() {
                collector.push_line(&text);
            }
            break;
        }
    }

    on_progress(tracker.finish(collector.len()));

    info!(
        entries = collector.len(),
        excluded = collector.excluded,
        live = collector.live,
        orphaned = collector.orphaned,
        bytes = file_len,
        "Parsing complete"
    );

    Ok(collector.entries)
}

async fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Decodes `src` onto `dst`, growing `dst` as needed.
fn decode_chunk(decoder: &mut Decoder, mut src: &[u8], dst: &mut String, last: bool) {
    loop {
        let needed = decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len().saturating_mul(3) + 16);
        dst.reserve(needed);
        let (result, read, _had_replacements) = decoder.decode_to_string(src, dst, last);
        src = &src[read..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => {}
        }
    }
}

/// Finds the first line in `text` as `(line length, terminator length)`.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. A `\r` at the very end is
/// held back until the next chunk (or `last`) tells whether `\n` follows.
fn next_line(text: &str, last: bool) -> Option<(usize, usize)> {
    let end = text.find(['\r', '\n'])?;
    let bytes = text.as_bytes();
    if bytes[end] == b'\n' {
        return Some((end, 1));
    }
    match bytes.get(end + 1) {
        Some(b'\n') => Some((end, 2)),
        Some(_) => Some((end, 1)),
        None if last => Some((end, 1)),
        None => None,
    }
}

/// Strips a stray BOM, NULs and surrounding whitespace.
fn normalize_line(raw: &str) -> Cow<'_, str> {
    let line = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    if line.contains('\0') {
        Cow::Owned(line.replace('\0', "").trim().to_string())
    } else {
        Cow::Borrowed(line.trim())
    }
}

/// Pairs metadata lines with their URL line and builds entries.
struct EntryCollector<'a> {
    rules: &'a ClassifierRules,
    pending: Option<String>,
    entries: Vec<PlaylistEntry>,
    excluded: usize,
    live: usize,
    orphaned: usize,
}

impl<'a> EntryCollector<'a> {
    fn new(rules: &'a ClassifierRules) -> Self {
        Self {
            rules,
            pending: None,
            entries: Vec::with_capacity(4096),
            excluded: 0,
            live: 0,
            orphaned: 0,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn push_line(&mut self, raw: &str) {
        let line = normalize_line(raw);
        if line.is_empty() {
            return;
        }

        if is_extinf(&line) {
            // Last metadata wins; an unpaired earlier line is dropped.
            if self.pending.replace(line.into_owned()).is_some() {
                self.orphaned += 1;
            }
            return;
        }

        if line.starts_with('#') {
            return;
        }

        if let Some(meta_line) = self.pending.take() {
            self.accept(&meta_line, &line);
        }
    }

    fn accept(&mut self, meta_line: &str, url: &str) {
        let meta = parse_extinf(meta_line);

        if self.rules.is_excluded_group(&meta.group) {
            trace!(group = %meta.group, title = %meta.title, "excluded group");
            self.excluded += 1;
            return;
        }

        let season_episode = season_episode(&meta.title);
        let media_type = self
            .rules
            .classify(&meta.title, &meta.group, url, season_episode);
        if media_type == MediaType::Live {
            trace!(title = %meta.title, "skipping live entry");
            self.live += 1;
            return;
        }

        self.entries.push(PlaylistEntry {
            id: EntryId(self.entries.len()),
            media_type,
            group_label: meta.group,
            title: meta.title,
            season_episode,
            logo_url: meta.logo,
            file_extension: extension_from_url(url),
            source_url: url.to_string(),
        });
    }
}

/// Throttles and clamps parse progress.
///
/// An intermediate report goes out when [`PROGRESS_INTERVAL`] has elapsed or
/// the whole-number percent has advanced.
struct ProgressTracker {
    total_bytes: u64,
    last_percent: u8,
    last_report: Instant,
}

impl ProgressTracker {
    fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            last_percent: 0,
            last_report: Instant::now(),
        }
    }

    fn start(&mut self) -> ParseProgress {
        self.last_report = Instant::now();
        ParseProgress {
            percent: 0,
            bytes_read: 0,
            total_bytes: self.total_bytes,
            entries: 0,
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn percent_of(&self, bytes_read: u64) -> u8 {
        let ratio = bytes_read as f64 / self.total_bytes.max(1) as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn snapshot(&mut self, bytes_read: u64, entries: usize) -> ParseProgress {
        self.last_percent = self.last_percent.max(self.percent_of(bytes_read));
        self.last_report = Instant::now();
        ParseProgress {
            percent: self.last_percent,
            bytes_read: bytes_read.min(self.total_bytes),
            total_bytes: self.total_bytes,
            entries,
        }
    }

    fn tick(&mut self, bytes_read: u64, entries: usize) -> Option<ParseProgress> {
        let due = self.last_report.elapsed() >= PROGRESS_INTERVAL
            || self.percent_of(bytes_read) > self.last_percent;
        due.then(|| self.snapshot(bytes_read, entries))
    }

    fn finish(&mut self, entries: usize) -> ParseProgress {
        self.last_percent = 100;
        ParseProgress {
            percent: 100,
            bytes_read: self.total_bytes,
            total_bytes: self.total_bytes,
            entries,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn collect(lines: &[&str]) -> Vec<PlaylistEntry> {
        let rules = ClassifierRules::default();
        let mut collector = EntryCollector::new(&rules);
        for line in lines {
            collector.push_line(line);
        }
        collector.entries
    }

    #[test]
    fn test_collector_pairs_metadata_with_next_url() {
        let entries = collect(&[
            "#EXTM3U",
            r#"#EXTINF:-1 group-title="Films",Heat (1995)"#,
            "http://h/movie/u/p/1.mkv",
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Heat (1995)");
        assert_eq!(entries[0].media_type, MediaType::Movie);
        assert_eq!(entries[0].file_extension, ".mkv");
        assert_eq!(entries[0].id, EntryId(0));
    }

    #[test]
    fn test_collector_last_metadata_wins() {
        let entries = collect(&[
            "#EXTINF:-1,First",
            "#EXTINF:-1,Second",
            "http://h/movie/2.mp4",
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Second");
    }

    #[test]
    fn test_collector_skips_blank_and_directive_lines_between_pair() {
        let entries = collect(&[
            "#EXTINF:-1,Heat",
            "",
            "   ",
            "#EXTGRP:Action",
            "http://h/movie/1.mkv",
        ]);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_collector_ignores_url_without_metadata() {
        let entries = collect(&["http://h/movie/1.mkv", "http://h/movie/2.mkv"]);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_collector_drops_excluded_and_live_entries() {
        let entries = collect(&[
            r#"#EXTINF:-1 group-title="AR: Films",Film"#,
            "http://h/movie/1.mkv",
            r#"#EXTINF:-1 group-title="Sport",Match"#,
            "http://h/live/9.ts",
            r#"#EXTINF:-1 group-title="FR",TF1"#,
            "http://h/u/p/1001",
            r#"#EXTINF:-1 group-title="FR Films",Kept"#,
            "http://h/movie/3.mkv",
        ]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Kept");
        assert_eq!(entries[0].id, EntryId(0));
    }

    #[test]
    fn test_collector_normalizes_bom_nul_and_crlf() {
        let entries = collect(&["\u{FEFF}#EXTINF:-1,Heat\r", "http://h/mo\0vie/1.mkv\r"]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_url, "http://h/movie/1.mkv");
    }

    #[test]
    fn test_collector_episode_fields() {
        let entries = collect(&[
            r#"#EXTINF:-1 tvg-name="Lupin S02E05" group-title="Séries FR",Lupin"#,
            "http://h/series/u/p/55.mkv",
        ]);
        assert_eq!(entries[0].media_type, MediaType::Episode);
        assert_eq!(entries[0].season(), Some(2));
        assert_eq!(entries[0].episode(), Some(5));
    }

    #[test]
    fn test_progress_tracker_never_decreases() {
        let mut tracker = ProgressTracker::new(1000);
        let a = tracker.snapshot(600, 1);
        let b = tracker.snapshot(400, 1);
        assert_eq!(a.percent, 60);
        assert_eq!(b.percent, 60);
        assert_eq!(tracker.finish(2).percent, 100);
    }

    #[test]
    fn test_progress_tracker_reports_on_percent_advance() {
        let mut tracker = ProgressTracker::new(1000);
        tracker.start();
        assert!(tracker.tick(4, 0).is_none(), "still 0%");
        assert_eq!(tracker.tick(250, 3).map(|p| p.percent), Some(25));
        assert!(tracker.tick(250, 4).is_none());
    }

    #[test]
    fn test_progress_tracker_empty_file() {
        let mut tracker = ProgressTracker::new(0);
        let start = tracker.start();
        assert_eq!(start.percent, 0);
        let done = tracker.finish(0);
        assert_eq!(done.percent, 100);
        assert_eq!(done.bytes_read, 0);
    }

    #[test]
    fn test_next_line_accepts_every_terminator() {
        assert_eq!(next_line("a\nb", false), Some((1, 1)));
        assert_eq!(next_line("a\r\nb", false), Some((1, 2)));
        assert_eq!(next_line("a\rb", false), Some((1, 1)));
        assert_eq!(next_line("abc", false), None);
    }

    #[test]
    fn test_next_line_holds_trailing_cr_until_more_text() {
        assert_eq!(next_line("a\r", false), None);
        assert_eq!(next_line("a\r", true), Some((1, 1)));
    }

    fn write_playlist(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tv.m3u");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_playlist_cr_only_line_endings() {
        let (_dir, path) = write_playlist(
            b"#EXTM3U\r#EXTINF:-1 group-title=\"Films\",Heat\rhttp://h/movie/u/p/1.mkv\r\
#EXTINF:-1 group-title=\"Films\",Alien\rhttp://h/movie/u/p/2.mkv\r",
        );

        let entries =
            tokio_test::block_on(parse_playlist(&path, |_| {}, &CancellationToken::new()))
                .unwrap();

        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Heat", "Alien"]);
        assert_eq!(entries[1].source_url, "http://h/movie/u/p/2.mkv");
    }

    #[test]
    fn test_parse_playlist_first_report_is_zero_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"#EXTM3U\n");
        let (_dir, path) = write_playlist(&bytes);

        let mut reports = Vec::new();
        tokio_test::block_on(parse_playlist(
            &path,
            |p| reports.push(p),
            &CancellationToken::new(),
        ))
        .unwrap();

        assert_eq!(reports.first().map(|p| p.percent), Some(0));
        assert_eq!(reports.last().map(|p| p.percent), Some(100));
    }

    #[test]
    fn test_parse_playlist_cancelled_from_progress_callback() {
        let mut big = String::from("#EXTM3U\n");
        for i in 0..20_000 {
            big.push_str(&format!(
                "#EXTINF:-1 group-title=\"Films\",Movie {i}\nhttp://h/movie/u/p/{i}.mkv\n"
            ));
        }
        let (_dir, path) = write_playlist(big.as_bytes());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut reports = Vec::new();
        let result = tokio_test::block_on(parse_playlist(
            &path,
            |p| {
                if p.percent > 0 {
                    trigger.cancel();
                }
                reports.push(p);
            },
            &cancel,
        ));

        assert!(matches!(result, Err(ParseError::Cancelled)), "got {result:?}");
        let last = reports.last().unwrap();
        assert!(last.percent > 0 && last.percent < 100, "got {last:?}");
    }

    #[test]
    fn test_decode_chunk_handles_split_utf16_code_unit() {
        let bytes: Vec<u8> = "é\n".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut decoder = encoding_rs::UTF_16LE.new_decoder_without_bom_handling();
        let mut text = String::new();
        decode_chunk(&mut decoder, &bytes[..1], &mut text, false);
        decode_chunk(&mut decoder, &bytes[1..], &mut text, false);
        decode_chunk(&mut decoder, &[], &mut text, true);
        assert_eq!(text, "é\n");
    }

    #[test]
    fn test_parse_playlist_missing_file_is_not_found() {
        let cancel = CancellationToken::new();
        let result = tokio_test::block_on(parse_playlist(
            Path::new("/definitely/not/here.m3u"),
            |_| {},
            &cancel,
        ));
        assert!(matches!(result, Err(ParseError::NotFound { .. })));
    }
}
