use anyhow::Context;
use colored::Colorize;
use std::collections::VecDeque;
use std::fs;
use std::sync::{Mutex, OnceLock};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::modules::config::get_socket_path;

/// Debug viewers connect over Unix sockets and need a shared channel to receive live logs.
pub static LOG_CHANNEL: OnceLock<broadcast::Sender<String>> = OnceLock::new();
/// Viewers that connect after boot would miss initialization messages without a replay buffer.
pub static STARTUP_BUFFER: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

const REPLAY_LINES: usize = 50;

pub fn log_info(scope: &str, msg: &str) {
    emit(tracing::Level::INFO, scope, msg);
}

pub fn log_debug(scope: &str, msg: &str) {
    emit(tracing::Level::DEBUG, scope, msg);
}

pub fn log_warn(scope: &str, msg: &str) {
    emit(tracing::Level::WARN, scope, msg);
}

pub fn log_error(scope: &str, msg: &str) {
    emit(tracing::Level::ERROR, scope, msg);
}

// Before init_logging() runs there is no subscriber; keep those lines visible on stderr.
fn emit(level: tracing::Level, scope: &str, msg: &str) {
    if !tracing::dispatcher::has_been_set() {
        if level <= tracing::Level::INFO {
            eprintln!("{} [{}] {}", level, scope, msg);
        }
        return;
    }
    match level {
        tracing::Level::ERROR => tracing::error!("[{}] {}", scope, msg),
        tracing::Level::WARN => tracing::warn!("[{}] {}", scope, msg),
        tracing::Level::INFO => tracing::info!("[{}] {}", scope, msg),
        _ => tracing::debug!("[{}] {}", scope, msg),
    }
}

fn remember(buffer: &Mutex<VecDeque<String>>, line: &str) {
    if let Ok(mut lock) = buffer.lock() {
        if lock.len() >= REPLAY_LINES {
            lock.pop_front();
        }
        lock.push_back(line.to_string());
    }
}

struct SocketSubscriberLayer;

impl<S> Layer<S> for SocketSubscriberLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();

        let level_color = match *metadata.level() {
            tracing::Level::ERROR => "ERROR".red(),
            tracing::Level::WARN => "WARN".yellow(),
            tracing::Level::INFO => "INFO".green(),
            tracing::Level::DEBUG => "DEBUG".blue(),
            tracing::Level::TRACE => "TRACE".magenta(),
        };

        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string().dimmed();

        struct MessageVisitor(String);
        impl tracing::field::Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    // fmt::Arguments implements Debug but not Display, so {:?} is correct here.
                    self.0.push_str(&format!("{:?}", value));
                } else {
                    self.0.push_str(&format!(" {}={:?}", field.name(), value));
                }
            }
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.0.push_str(value);
                } else {
                    self.0.push_str(&format!(" {}={}", field.name(), value));
                }
            }
        }

        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);

        let msg = format!("{} [{}] {}\n", timestamp, level_color, visitor.0);

        if let Some(buffer) = STARTUP_BUFFER.get() {
            remember(buffer, &msg);
        }

        if let Some(sender) = LOG_CHANNEL.get() {
            let _ = sender.send(msg);
        }
    }
}

/// Installs the global subscriber. With `enable_debug` the bar also serves
/// its log over a Unix socket for `ybar internal-watch`.
pub fn init_logging(enable_debug: bool, config_level: &str, config_filter: &str) -> anyhow::Result<()> {
    // Debug viewers expect ANSI colors even though the bar may run without a TTY.
    colored::control::set_override(true);

    let (tx, _) = broadcast::channel(100);
    LOG_CHANNEL
        .set(tx.clone())
        .map_err(|_| anyhow::anyhow!("Failed to set global log channel"))?;

    STARTUP_BUFFER
        .set(Mutex::new(VecDeque::with_capacity(REPLAY_LINES)))
        .map_err(|_| anyhow::anyhow!("Failed to set global startup buffer"))?;

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .parse_lossy(if enable_debug {
            config_filter
        } else {
            config_level
        });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time(); // timestamps come from the socket layer or systemd journal

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(SocketSubscriberLayer)
        .init();

    if enable_debug {
        serve_debug_socket(tx)?;
    }

    Ok(())
}

fn serve_debug_socket(tx: broadcast::Sender<String>) -> anyhow::Result<()> {
    let socket_path = get_socket_path();
    if socket_path.exists() {
        let _ = fs::remove_file(&socket_path);
    }

    let listener = UnixListener::bind(&socket_path).context("Failed to bind debug socket")?;
    log_debug("LOG", &format!("Debug socket at {:?}", socket_path));

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let (_reader, mut writer) = stream.into_split();
                    let mut rx = tx.subscribe();

                    tokio::spawn(async move {
                        let replay: Vec<String> = STARTUP_BUFFER
                            .get()
                            .and_then(|buffer| buffer.lock().ok().map(|l| l.iter().cloned().collect()))
                            .unwrap_or_default();

                        for line in replay {
                            if writer.write_all(line.as_bytes()).await.is_err() {
                                return;
                            }
                        }

                        loop {
                            match rx.recv().await {
                                Ok(msg) => {
                                    if writer.write_all(msg.as_bytes()).await.is_err() {
                                        break;
                                    }
                                }
                                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                                Err(broadcast::error::RecvError::Closed) => break,
                            }
                        }
                    });
                }
                Err(e) => eprintln!("Accept failed: {}", e),
            }
        }
    });

    Ok(())
}
