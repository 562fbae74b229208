use crate::modules::config::get_socket_path;
use crate::modules::logging::{log_info, log_warn};
use anyhow::{Context, Result};
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

const TERMINALS: [&str; 5] = ["foot", "alacritty", "kitty", "gnome-terminal", "xterm"];

/// `ybar internal-watch`: prints the bar's debug log, reconnecting whenever
/// the bar restarts.
pub async fn run_watcher(socket_path: &Path) -> Result<()> {
    loop {
        let mut stream = loop {
            match UnixStream::connect(socket_path).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        };

        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                // EOF: the bar went away
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    print!("{}", String::from_utf8_lossy(&buf[..n]));
                    io::stdout().flush().ok();
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn find_terminal() -> Option<String> {
    env::var("TERMINAL")
        .ok()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            TERMINALS
                .iter()
                .find(|term| which::which(term).is_ok())
                .map(|term| term.to_string())
        })
}

/// Opens a terminal running the log viewer for this bar.
pub fn spawn_debug_viewer() -> Result<()> {
    let Some(term) = find_terminal() else {
        log_warn("LOG", "No compatible terminal found for the debug viewer");
        return Ok(());
    };

    let self_exe = env::current_exe().context("Failed to get current executable path")?;
    Command::new(&term)
        .arg("-e")
        .arg(&self_exe)
        .arg("internal-watch")
        .arg(get_socket_path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to spawn debug terminal {}", term))?;

    log_info("LOG", &format!("Debug viewer spawned in {}", term));
    Ok(())
}
