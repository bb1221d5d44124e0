//! Subcommand handlers.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use m3u_organizer_core::library::GroupFilter;
use m3u_organizer_core::{
    BatchDownloader, CancellationToken, Catalog, EntryFilter, EntryState, Facets, HttpClient,
    PlaylistEntry, RetryPolicy, build_index, parse_playlist_with_rules,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::ProcessExit;
use crate::app::config::LoadedConfig;
use crate::app::config_runtime::{RuntimeSettings, verbosity_label};
use crate::app::exit_handler::determine_exit_outcome;
use crate::app::progress::{BatchBars, FetchBar, ParseBar};
use crate::app::source::resolve_source;
use crate::cli::{DownloadArgs, FetchArgs, FilterArgs, ListArgs};

/// Shared inputs of every command.
pub(crate) struct CommandContext<'a> {
    pub(crate) settings: &'a RuntimeSettings,
    pub(crate) show_progress: bool,
    pub(crate) cancel: &'a CancellationToken,
}

impl CommandContext<'_> {
    fn http_client(&self) -> HttpClient {
        let client = HttpClient::new_with_timeouts(
            self.settings.connect_timeout_secs,
            self.settings.read_timeout_secs,
        );
        match &self.settings.referer {
            Some(origin) => client.with_referer(origin.as_str()),
            None => client,
        }
    }
}

pub(crate) fn build_filter(args: &FilterArgs) -> EntryFilter {
    EntryFilter {
        media: args.media.unwrap_or_default(),
        group: args
            .group
            .as_deref()
            .map_or(GroupFilter::Any, GroupFilter::from_label),
        season: args.season.unwrap_or_default(),
        extension: args.extension.clone().unwrap_or_default(),
        search: args.search.clone(),
        hide_existing: args.hide_existing,
    }
}

async fn load_catalog(
    source: &str,
    root: Option<&Path>,
    ctx: &CommandContext<'_>,
) -> Result<Catalog> {
    let client = ctx.http_client();
    let playlist = resolve_source(source, &client, ctx.show_progress, ctx.cancel).await?;

    let bar = ParseBar::new(ctx.show_progress);
    let parsed = parse_playlist_with_rules(
        playlist.path(),
        &ctx.settings.rules,
        |progress| bar.update(&progress),
        ctx.cancel,
    )
    .await;
    bar.finish();
    let entries = parsed.with_context(|| format!("Failed to parse playlist {source}"))?;

    let mut catalog = Catalog::new(entries);
    if let Some(root) = root {
        catalog.attach_library(root, build_index(root));
    }
    Ok(catalog)
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    #[serde(flatten)]
    entry: &'a PlaylistEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_path: Option<&'a Path>,
    exists_locally: bool,
}

pub(crate) async fn run_list(args: &ListArgs, ctx: &CommandContext<'_>) -> Result<ProcessExit> {
    let root = args.root.as_deref().or(ctx.settings.root.as_deref());
    let catalog = load_catalog(&args.source, root, ctx).await?;
    let filter = build_filter(&args.filters);

    let out = if args.facets {
        let facets = Facets::from_entries(catalog.filtered(&filter).map(|(entry, _)| entry));
        render_facets(&facets)
    } else if args.json {
        let listed: Vec<ListedEntry<'_>> = catalog
            .filtered(&filter)
            .map(|(entry, state)| ListedEntry {
                entry,
                target_path: state.target_path.as_deref(),
                exists_locally: state.exists_locally,
            })
            .collect();
        let mut json = serde_json::to_string_pretty(&listed)?;
        json.push('\n');
        json
    } else {
        catalog
            .filtered(&filter)
            .map(|(entry, state)| render_row(entry, state))
            .collect()
    };

    print!("{out}");
    info!(
        total = catalog.len(),
        shown = catalog.filtered(&filter).count(),
        "listing complete"
    );
    Ok(ProcessExit::Success)
}

fn render_row(entry: &PlaylistEntry, state: &EntryState) -> String {
    let season_episode = entry.season_episode.map_or_else(
        || "-".to_string(),
        |se| format!("S{:02}E{:02}", se.season, se.episode),
    );
    let extension = if entry.file_extension.is_empty() {
        "-"
    } else {
        entry.file_extension.as_str()
    };
    let presence = if state.exists_locally { "present" } else { "-" };
    format!(
        "{}\t{}\t{}\t{}\t{season_episode}\t{extension}\t{presence}\t{}\n",
        entry.id.0,
        entry.media_type.as_str(),
        entry.group_label,
        entry.title,
        entry.source_url
    )
}

fn render_facets(facets: &Facets) -> String {
    let mut out = String::from("groups:\n");
    for (group, count) in &facets.groups {
        let _ = writeln!(out, "  {group}\t{count}");
    }
    if facets.ungrouped > 0 {
        let _ = writeln!(out, "  (none)\t{}", facets.ungrouped);
    }

    out.push_str("seasons:\n");
    for (season, count) in &facets.seasons {
        let _ = writeln!(out, "  {season}\t{count}");
    }
    if facets.no_season > 0 {
        let _ = writeln!(out, "  (none)\t{}", facets.no_season);
    }

    out.push_str("extensions:\n");
    for (extension, count) in &facets.extensions {
        let _ = writeln!(out, "  {extension}\t{count}");
    }
    if facets.no_extension > 0 {
        let _ = writeln!(out, "  (none)\t{}", facets.no_extension);
    }
    out
}

pub(crate) async fn run_download(
    args: &DownloadArgs,
    ctx: &CommandContext<'_>,
) -> Result<ProcessExit> {
    let Some(root) = args.root.as_deref().or(ctx.settings.root.as_deref()) else {
        bail!("No library root given. Pass --root or set `root_dir` in the config file");
    };

    let mut catalog = load_catalog(&args.source, Some(root), ctx).await?;
    let filter = build_filter(&args.filters);

    let selection: Vec<_> = catalog
        .filtered(&filter)
        .filter(|(entry, state)| {
            entry.media_type.is_downloadable() && (args.include_existing || !state.exists_locally)
        })
        .map(|(entry, _)| entry.id)
        .collect();
    for id in &selection {
        catalog.set_selected(*id, true);
    }
    let selection = catalog.selected_ids();

    if selection.is_empty() {
        info!("Nothing to download");
        return Ok(ProcessExit::Success);
    }

    if args.dry_run {
        for id in &selection {
            if let (Some(entry), Some(state)) = (catalog.entry(*id), catalog.state(*id))
                && let Some(target) = &state.target_path
            {
                println!("{}\t{}", entry.title, target.display());
            }
        }
        info!(selected = selection.len(), "dry run, nothing downloaded");
        return Ok(ProcessExit::Success);
    }

    let mut bars = BatchBars::new(ctx.show_progress, selection.len());
    let summary = BatchDownloader::new(ctx.http_client())
        .with_delay(ctx.settings.delay)
        .run(
            &mut catalog,
            &selection,
            root,
            |event| bars.handle(&event),
            ctx.cancel,
        )
        .await;
    bars.finish();

    if summary.cancelled {
        warn!("Batch interrupted; partial files resume on the next run");
    }
    info!(
        completed = summary.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        "Download complete"
    );
    Ok(determine_exit_outcome(&summary))
}

pub(crate) async fn run_fetch(args: &FetchArgs, ctx: &CommandContext<'_>) -> Result<ProcessExit> {
    let bar = FetchBar::new(ctx.show_progress);
    let result = ctx
        .http_client()
        .fetch_playlist(
            &args.url,
            &args.dest,
            &RetryPolicy::default(),
            |progress| bar.update(&progress),
            ctx.cancel,
        )
        .await;
    bar.finish();
    let outcome = result.with_context(|| format!("Failed to fetch playlist from {}", args.url))?;
    info!(
        bytes = outcome.bytes_on_disk,
        dest = %outcome.path.display(),
        "Playlist saved"
    );
    Ok(ProcessExit::Success)
}

pub(crate) fn run_config_show(loaded: &LoadedConfig, settings: &RuntimeSettings) -> ProcessExit {
    print!("{}", render_config(loaded, settings));
    ProcessExit::Success
}

fn render_config(loaded: &LoadedConfig, settings: &RuntimeSettings) -> String {
    let mut out = String::new();
    let path = loaded
        .path
        .as_ref()
        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
    let _ = writeln!(out, "config_path = {path}");
    let _ = writeln!(out, "loaded_from_file = {}", loaded.loaded_from_file());
    let root = settings
        .root
        .as_ref()
        .map_or_else(|| "(unset)".to_string(), |p| p.display().to_string());
    let _ = writeln!(out, "root_dir = {root}");
    let _ = writeln!(
        out,
        "delay_between_files_secs = {}",
        settings.delay.as_secs()
    );
    let _ = writeln!(out, "connect_timeout_secs = {}", settings.connect_timeout_secs);
    let _ = writeln!(out, "read_timeout_secs = {}", settings.read_timeout_secs);
    let _ = writeln!(
        out,
        "referer = {}",
        settings.referer.as_deref().unwrap_or("(per URL)")
    );
    let _ = writeln!(out, "verbosity = {}", verbosity_label(settings.verbosity));
    out
}
