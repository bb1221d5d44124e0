//! Progress UI (indicatif bars) for parsing and batch downloads.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use m3u_organizer_core::{BatchEvent, DownloadProgress, EntryStatus, ParseProgress};

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn bar_or_hidden(enabled: bool, len: u64) -> ProgressBar {
    if enabled {
        ProgressBar::new(len)
    } else {
        ProgressBar::hidden()
    }
}

/// Bar shown while a playlist is parsed.
pub(crate) struct ParseBar {
    bar: ProgressBar,
}

impl ParseBar {
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = bar_or_hidden(enabled, 100);
        bar.set_style(style("{spinner} Parsing [{bar:30}] {pos:>3}% {msg}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub(crate) fn update(&self, progress: &ParseProgress) {
        self.bar.set_position(u64::from(progress.percent));
        self.bar.set_message(format!("{} entries", progress.entries));
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Bar shown while a single playlist file is fetched.
pub(crate) struct FetchBar {
    bar: ProgressBar,
}

impl FetchBar {
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = bar_or_hidden(enabled, 100);
        bar.set_style(style("{spinner} Fetching playlist {msg}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub(crate) fn update(&self, progress: &DownloadProgress) {
        self.bar.set_message(progress.status.clone());
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Two stacked bars: batch position and current file.
pub(crate) struct BatchBars {
    _multi: MultiProgress,
    overall: ProgressBar,
    file: ProgressBar,
    current_title: String,
}

impl BatchBars {
    pub(crate) fn new(enabled: bool, total: usize) -> Self {
        let multi = MultiProgress::new();
        let total = u64::try_from(total).unwrap_or(u64::MAX);
        let overall = multi.add(bar_or_hidden(enabled, total));
        overall.set_style(style("[{pos}/{len}] {wide_msg}"));
        let file = multi.add(bar_or_hidden(enabled, 100));
        file.set_style(style("  [{bar:30}] {msg}"));
        Self {
            _multi: multi,
            overall,
            file,
            current_title: String::new(),
        }
    }

    pub(crate) fn handle(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::EntryStarted {
                title,
                position,
                total,
                ..
            } => {
                self.current_title.clone_from(title);
                self.overall
                    .set_length(u64::try_from(*total).unwrap_or(u64::MAX));
                self.overall
                    .set_position(u64::try_from(position.saturating_sub(1)).unwrap_or(0));
                self.overall.set_message(title.clone());
                self.file.set_position(0);
                self.file.set_message(EntryStatus::Preparing.to_string());
            }
            BatchEvent::File { progress, .. } => {
                self.file.set_position(percent_position(progress.percent));
                self.file.set_message(progress.status.clone());
            }
            BatchEvent::EntryFinished { status, .. } => {
                if matches!(status, EntryStatus::Failed(_)) {
                    self.overall
                        .println(format!("{}: {status}", self.current_title));
                }
                self.file.set_message(status.to_string());
            }
            BatchEvent::Batch { done, .. } => {
                self.overall
                    .set_position(u64::try_from(*done).unwrap_or(u64::MAX));
            }
        }
    }

    pub(crate) fn finish(&self) {
        self.file.finish_and_clear();
        self.overall.finish_and_clear();
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}
