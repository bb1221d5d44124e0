use std::io::{self, IsTerminal};

use anyhow::Result;
use m3u_organizer_core::CancellationToken;
use tracing::{debug, info};

use crate::ProcessExit;
use crate::app::commands::{self, CommandContext};
use crate::app::{config, config_runtime, terminal};
use crate::cli::{Command, ConfigCommand};

pub(crate) async fn run_organizer() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();
    let loaded = config::load_default_file_config()?;
    let settings = config_runtime::resolve_settings(&cli, &cli_sources, loaded.config.as_ref())?;

    let default_level = config_runtime::resolve_default_log_level(settings.verbosity);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let no_color =
        terminal::should_disable_color(terminal::no_color_env_requested(), terminal::is_dumb_terminal());
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(?cli, "CLI arguments parsed");
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.loaded_from_file()) {
        debug!(path = %path.display(), "configuration loaded");
    }

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            cancel_on_signal.cancel();
        }
    });

    let ctx = CommandContext {
        settings: &settings,
        show_progress: terminal::should_use_progress_bars(
            io::stderr().is_terminal(),
            settings.verbosity.quiet,
            terminal::is_dumb_terminal(),
        ),
        cancel: &cancel,
    };

    match &cli.command {
        Command::List(args) => commands::run_list(args, &ctx).await,
        Command::Download(args) => commands::run_download(args, &ctx).await,
        Command::Fetch(args) => commands::run_fetch(args, &ctx).await,
        Command::Config {
            command: ConfigCommand::Show,
        } => Ok(commands::run_config_show(&loaded, &settings)),
    }
}
