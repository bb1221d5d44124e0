//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use m3u_organizer_core::library::{ExtensionFilter, SeasonFilter, TypeFilter};

/// Turn IPTV playlists into an organized movie and series library.
///
/// Parses M3U playlists (local files or http(s) URLs), lists and filters their
/// entries, and downloads movies and episodes into `Films/`, `Series/` and
/// `Autre/` folders with resumable transfers.
#[derive(Parser, Debug)]
#[command(name = "m3u-organizer")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a playlist and print its entries or facets
    List(ListArgs),
    /// Download selected movies and episodes into the library
    Download(DownloadArgs),
    /// Fetch a remote playlist to a local file
    Fetch(FetchArgs),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Print the effective configuration and where it was loaded from
    Show,
}

/// View filters shared by `list` and `download`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Media types to keep: all, movies-and-series, series, movies
    #[arg(long = "type", value_name = "TYPE")]
    pub media: Option<TypeFilter>,

    /// Exact group label ("" selects entries without a group)
    #[arg(long)]
    pub group: Option<String>,

    /// Season number, or "none" for entries without one
    #[arg(long)]
    pub season: Option<SeasonFilter>,

    /// File extension such as .mkv, or "none"
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: Option<ExtensionFilter>,

    /// Case-insensitive text searched in title, group and URL
    #[arg(long)]
    pub search: Option<String>,

    /// Hide entries already present in the library
    #[arg(long)]
    pub hide_existing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Playlist path or http(s) URL
    pub source: String,

    /// Library root used to flag entries already downloaded
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Print entries as JSON
    #[arg(long, conflicts_with = "facets")]
    pub json: bool,

    /// Print distinct groups, seasons and extensions with counts
    #[arg(long)]
    pub facets: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Playlist path or http(s) URL
    pub source: String,

    /// Library root (falls back to `root_dir` from the config file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Seconds to wait between two files (0-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub delay: Option<u64>,

    /// Print planned destinations without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Also process entries already in the library (resumes partial files)
    #[arg(long)]
    pub include_existing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Playlist URL
    pub url: String,

    /// Destination file
    pub dest: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_list_minimal_parses_successfully() {
        let cli = parse(&["m3u-organizer", "list", "playlist.m3u"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.source, "playlist.m3u");
        assert!(args.root.is_none());
        assert!(!args.json);
        assert!(args.filters.media.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = parse(&["m3u-organizer", "-v", "list", "a.m3u"]);
        assert_eq!(cli.verbose, 1);

        let cli = parse(&["m3u-organizer", "list", "a.m3u", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let cli = parse(&["m3u-organizer", "--quiet", "fetch", "http://h/p.m3u", "out.m3u"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Cli::try_parse_from(["m3u-organizer", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_missing_subcommand_returns_error() {
        assert!(Cli::try_parse_from(["m3u-organizer"]).is_err());
    }

    #[test]
    fn test_cli_filters_parse_into_typed_values() {
        let cli = parse(&[
            "m3u-organizer",
            "list",
            "a.m3u",
            "--type",
            "series",
            "--group",
            "Séries FR",
            "--season",
            "2",
            "--ext",
            "MKV",
            "--search",
            "lupin",
            "--hide-existing",
        ]);
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.filters.media, Some(TypeFilter::Series));
        assert_eq!(args.filters.group.as_deref(), Some("Séries FR"));
        assert_eq!(args.filters.season, Some(SeasonFilter::Season(2)));
        assert_eq!(
            args.filters.extension,
            Some(ExtensionFilter::Extension(".mkv".to_string()))
        );
        assert_eq!(args.filters.search.as_deref(), Some("lupin"));
        assert!(args.filters.hide_existing);
    }

    #[test]
    fn test_cli_invalid_type_filter_returns_error() {
        let result = Cli::try_parse_from(["m3u-organizer", "list", "a.m3u", "--type", "cartoons"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_json_conflicts_with_facets() {
        let result =
            Cli::try_parse_from(["m3u-organizer", "list", "a.m3u", "--json", "--facets"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_download_options() {
        let cli = parse(&[
            "m3u-organizer",
            "download",
            "http://h/get.php",
            "--root",
            "/lib",
            "--delay",
            "0",
            "--dry-run",
        ]);
        let Command::Download(args) = cli.command else {
            panic!("expected download command");
        };
        assert_eq!(args.root, Some(PathBuf::from("/lib")));
        assert_eq!(args.delay, Some(0));
        assert!(args.dry_run);
        assert!(!args.include_existing);
    }

    #[test]
    fn test_cli_download_delay_range_enforced() {
        let result = Cli::try_parse_from([
            "m3u-organizer",
            "download",
            "a.m3u",
            "--delay",
            "3601",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_config_show() {
        let cli = parse(&["m3u-organizer", "config", "show"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                command: ConfigCommand::Show
            }
        ));
    }
}
