use anyhow::{Context, Result};
use clap::Parser;

use ybar::modules::cli::{Cli, Commands};
use ybar::modules::config;
use ybar::modules::logging::{self, *};
use ybar::modules::runner;
use ybar::modules::watcher;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The viewer only prints what the bar sends; it needs no config or logging.
    if let Some(Commands::InternalWatch { socket_path }) = &cli.command {
        return watcher::run_watcher(socket_path).await;
    }

    let bar_config = config::load_bar_config(&cli);

    // Logging depends on bar_config for level/filter settings.
    logging::init_logging(
        cli.debug,
        &bar_config.logging.level,
        &bar_config.logging.debug_filter,
    )
    .context("Failed to initialize logging")?;

    if cli.debug {
        watcher::spawn_debug_viewer().context("Failed to spawn debug viewer")?;
        log_info(
            "BAR",
            &format!("debug mode started. Socket: {:?}", config::get_socket_path()),
        );
    }

    log_info("BAR", &format!("ybar {} starting...", env!("CARGO_PKG_VERSION")));
    runner::run_server(bar_config).await
}
