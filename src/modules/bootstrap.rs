use crate::event::BarEvent;
use crate::modules::logging::{log_error, log_info};
use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc::UnboundedSender;

/// SIGTERM and SIGINT ask the controller to retire its windows and stop.
pub fn spawn_signal_handler(events: UnboundedSender<BarEvent>) -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut int = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = term.recv() => log_info("BAR", "Received SIGTERM, shutting down..."),
            _ = int.recv() => log_info("BAR", "Received SIGINT, shutting down..."),
        }

        if events.send(BarEvent::Shutdown).is_err() {
            log_error("BAR", "Controller already gone, exiting");
            std::process::exit(0);
        }
    });

    Ok(())
}
