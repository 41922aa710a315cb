use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::app::{context::RunContext, terminal};
use crate::app_config::{self, VerbositySetting};
use crate::cli::{Args, Command};
use crate::{ProcessExit, commands};

pub(crate) async fn run_manga_fetcher() -> Result<ProcessExit> {
    // Parse before tracing so --help prints without log noise.
    let args = Args::parse();
    let loaded = app_config::load_file_config_from(args.config.as_deref())?;

    let dumb_terminal = terminal::is_dumb_terminal();
    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        dumb_terminal,
    );
    let config_level = loaded.config.verbosity.map(VerbositySetting::log_level);
    terminal::init_tracing(
        &terminal::default_log_level(args.quiet, args.verbose, config_level),
        no_color,
    );
    debug!(
        command = ?args.command,
        config = ?loaded.path,
        from_file = loaded.loaded_from_file,
        "CLI arguments parsed"
    );

    let ctx = RunContext::resolve(&args, &loaded.config);
    let show_progress = terminal::should_show_progress(
        std::io::stderr().is_terminal(),
        args.quiet,
        dumb_terminal,
    );

    match args.command {
        Command::Sources => commands::run_sources_command(&ctx.open_session(false)?),
        Command::Toggle { source } => {
            commands::run_toggle_command(&ctx.open_session(false)?, &source)
        }
        Command::Search(search) => {
            commands::run_search_command(&ctx.open_session(false)?, &search).await
        }
        Command::Info(info) => commands::run_info_command(&ctx.registry()?, &info).await,
        Command::Latest { page, limit } => {
            commands::run_latest_command(&ctx.kisslove()?, page, limit).await
        }
        Command::Trending => commands::run_trending_command(&ctx.kisslove()?).await,
        Command::Select(select) => {
            commands::run_select_command(&ctx.open_session(false)?, &select).await
        }
        Command::Range { action } => {
            commands::run_range_command(&ctx.open_session(false)?, &action).await
        }
        Command::Download(download) => {
            let session = ctx.open_session(download.cbz)?;
            commands::run_download_command(&session, &download, show_progress).await
        }
        Command::Theme { name } => {
            commands::run_theme_command(&ctx.open_session(false)?, name.as_deref())
        }
        Command::Session => commands::run_session_command(&ctx.open_session(false)?),
    }
}
