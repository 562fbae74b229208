use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::BarConfig;
use crate::controller::Controller;
use crate::modules::logging::*;
use crate::modules::{bootstrap, listener};
use crate::sources::SysfsPowerSource;
use crate::wayland::WaylandBackend;

pub async fn run_server(config: BarConfig) -> Result<()> {
    log_debug("BAR", "Starting server initialization");
    let config = Arc::new(config);

    log_debug("WAYLAND", "Connecting to the compositor");
    let backend = WaylandBackend::connect(&config).context("Failed to initialize Wayland")?;
    log_info("WAYLAND", "Wayland integration initialized");

    let mut controller = Controller::new(
        config.clone(),
        backend,
        Arc::new(SysfsPowerSource::default()),
    );

    bootstrap::spawn_signal_handler(controller.sender())?;
    listener::spawn_sleep_listener(controller.sender());

    log_info("BAR", "Starting event loop");
    if let Err(e) = controller.run().await {
        log_error("WAYLAND", &format!("Event handling error: {:#}", e));
        return Err(e);
    }

    log_debug("BAR", "Server shutdown complete");
    Ok(())
}
