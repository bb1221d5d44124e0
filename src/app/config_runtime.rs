use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use m3u_organizer_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use m3u_organizer_core::{ClassifierRules, DEFAULT_DELAY_BETWEEN_FILES};

use crate::app::config::{FileConfig, VerbositySetting};
use crate::cli::{Cli, Command};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Verbosity after applying the config file under the CLI flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    pub(crate) verbose: u8,
    pub(crate) quiet: bool,
    pub(crate) debug: bool,
}

/// Settings shared by every command once CLI and file config are merged.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) verbosity: Verbosity,
    pub(crate) root: Option<PathBuf>,
    pub(crate) delay: Duration,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
    pub(crate) referer: Option<String>,
    pub(crate) rules: ClassifierRules,
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let command = Cli::command();
    let matches = command.get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = value_sources(&matches);
    (cli, sources)
}

fn value_sources(matches: &ArgMatches) -> CliValueSources {
    // Global flags given after the subcommand are recorded on the subcommand.
    let sub = matches.subcommand().map(|(_, sub)| sub);
    let from_cli = |id: &str| {
        is_commandline_value(matches, id) || sub.is_some_and(|sub| is_commandline_value(sub, id))
    };
    CliValueSources {
        verbose: from_cli("verbose"),
        quiet: from_cli("quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

pub(crate) fn resolve_settings(
    cli: &Cli,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<RuntimeSettings> {
    let defaults = FileConfig::default();
    let file_config = file_config.unwrap_or(&defaults);

    let mut verbosity = Verbosity {
        verbose: cli.verbose,
        quiet: cli.quiet,
        debug: false,
    };
    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(setting) = file_config.verbosity
    {
        verbosity = config_verbosity(setting);
    }

    let (cli_root, cli_delay) = match &cli.command {
        Command::List(args) => (args.root.clone(), None),
        Command::Download(args) => (args.root.clone(), args.delay),
        Command::Fetch(_) | Command::Config { .. } => (None, None),
    };

    let root = cli_root.or_else(|| file_config.root_dir.clone());
    let delay = cli_delay
        .or(file_config.delay_between_files_secs)
        .map_or(DEFAULT_DELAY_BETWEEN_FILES, Duration::from_secs);
    if delay > Duration::from_secs(3600) {
        bail!(
            "Invalid effective delay value: {}. Expected range: 0..=3600",
            delay.as_secs()
        );
    }

    let mut rules = ClassifierRules::default();
    if let Some(prefixes) = &file_config.excluded_group_prefixes {
        rules = rules.with_excluded_group_prefixes(prefixes);
    }
    if let Some(groups) = &file_config.live_groups {
        rules = rules.with_live_groups(groups);
    }

    Ok(RuntimeSettings {
        verbosity,
        root,
        delay,
        connect_timeout_secs: file_config
            .connect_timeout_secs
            .unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file_config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        referer: file_config.referer.clone(),
        rules,
    })
}

fn config_verbosity(setting: VerbositySetting) -> Verbosity {
    match setting {
        VerbositySetting::Default => Verbosity::default(),
        VerbositySetting::Verbose => Verbosity {
            verbose: 1,
            ..Verbosity::default()
        },
        VerbositySetting::Quiet => Verbosity {
            quiet: true,
            ..Verbosity::default()
        },
        VerbositySetting::Debug => Verbosity {
            debug: true,
            ..Verbosity::default()
        },
    }
}

pub(crate) fn resolve_default_log_level(verbosity: Verbosity) -> &'static str {
    if verbosity.quiet {
        "error"
    } else if verbosity.debug {
        "trace"
    } else {
        match verbosity.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

pub(crate) fn verbosity_label(verbosity: Verbosity) -> &'static str {
    if verbosity.debug {
        VerbositySetting::Debug.as_str()
    } else if verbosity.quiet {
        VerbositySetting::Quiet.as_str()
    } else if verbosity.verbose == 0 {
        VerbositySetting::Default.as_str()
    } else if verbosity.verbose == 1 {
        VerbositySetting::Verbose.as_str()
    } else {
        VerbositySetting::Debug.as_str()
    }
}
