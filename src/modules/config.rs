use crate::config::{BarConfig, parse_hex_color};
use crate::modules::cli::Cli;
use crate::modules::logging::{log_debug, log_error, log_warn};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ybar").join("ybar.toml"))
}

/// Resolves the settings record: file (or defaults), then CLI overrides.
pub fn load_bar_config(cli: &Cli) -> BarConfig {
    let path = cli.conf.clone().or_else(default_config_path);
    let mut config = match path {
        Some(path) => load_config_file(&path),
        None => {
            log_warn("CONFIG", "No config directory found; using defaults.");
            BarConfig::default()
        }
    };

    if cli.center_clock {
        config.layout.center_clock = true;
    }
    if cli.center_workspace {
        config.layout.center_workspace = true;
    }
    config
}

/// Missing file means defaults; a broken file is reported and also means
/// defaults.
pub fn load_config_file(path: &Path) -> BarConfig {
    if !path.exists() {
        log_debug(
            "CONFIG",
            &format!("{:?} not found; using defaults.", path),
        );
        return BarConfig::default();
    }

    match read_config(path) {
        Ok(config) => {
            warn_on_bad_colors(&config);
            config
        }
        Err(e) => {
            // Missing or broken config shouldn't prevent the bar from starting.
            log_error("CONFIG", &format!("{:#}", e));
            BarConfig::default()
        }
    }
}

fn read_config(path: &Path) -> Result<BarConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    toml::from_str(&raw).with_context(|| format!("Failed to deserialize config {:?}", path))
}

fn warn_on_bad_colors(config: &BarConfig) {
    for (key, value) in [
        ("style.text_color", &config.style.text_color),
        ("style.background", &config.style.background),
    ] {
        if parse_hex_color(value).is_none() {
            log_warn(
                "CONFIG",
                &format!("Invalid color {}={:?}, using the default", key, value),
            );
        }
    }
}

pub fn get_socket_path() -> PathBuf {
    let runtime_dir = dirs::runtime_dir().unwrap_or_else(env::temp_dir);

    runtime_dir.join("ybar-debug.sock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("ybar").chain(args.iter().copied()))
    }

    #[test]
    fn test_loads_file_and_applies_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ybar.toml");
        fs::write(
            &path,
            "[window]\nheight = 30\n[modules]\nworkspace_prefix = \"WS: \"\n",
        )
        .unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let config = load_bar_config(&cli(&["--conf", &path_arg, "--center-workspace"]));
        assert_eq!(config.window.height, 30);
        assert_eq!(config.modules.workspace_prefix, "WS: ");
        assert!(config.layout.center_workspace);
        assert!(!config.layout.center_clock);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config_file(&tmp.path().join("absent.toml"));
        assert_eq!(config, BarConfig::default());
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ybar.toml");
        fs::write(&path, "[window\nheight = ").unwrap();
        assert_eq!(load_config_file(&path), BarConfig::default());

        fs::write(&path, "[window]\nheight = \"tall\"\n").unwrap();
        assert_eq!(load_config_file(&path), BarConfig::default());
    }
}
