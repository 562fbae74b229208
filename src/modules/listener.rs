use crate::event::BarEvent;
use crate::modules::logging::{log_debug, log_warn};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// logind sends `PrepareForSleep(true)` before suspending and
/// `PrepareForSleep(false)` after resuming.
pub fn sleep_event(start: bool) -> BarEvent {
    if start {
        BarEvent::WillSleep
    } else {
        BarEvent::DidWake
    }
}

/// Forwards logind sleep/wake signals to the controller. Without a system
/// bus the bar keeps running, it just never pauses for sleep.
pub fn spawn_sleep_listener(events: UnboundedSender<BarEvent>) {
    tokio::spawn(async move {
        if let Err(e) = listen_for_sleep(events).await {
            log_warn("SLEEP", &format!("Sleep/wake tracking unavailable: {:#}", e));
        }
    });
}

async fn listen_for_sleep(events: UnboundedSender<BarEvent>) -> Result<()> {
    let conn = zbus::Connection::system()
        .await
        .context("Failed to connect to the system bus")?;
    let manager = LoginManagerProxy::new(&conn)
        .await
        .context("Failed to create logind proxy")?;
    let mut signals = manager
        .receive_prepare_for_sleep()
        .await
        .context("Failed to subscribe to PrepareForSleep")?;

    log_debug("SLEEP", "Listening for logind PrepareForSleep");

    while let Some(signal) = signals.next().await {
        let start = match signal.args() {
            Ok(args) => *args.start(),
            Err(e) => {
                log_warn("SLEEP", &format!("Malformed PrepareForSleep: {}", e));
                continue;
            }
        };
        if events.send(sleep_event(start)).is_err() {
            break;
        }
    }

    Ok(())
}
