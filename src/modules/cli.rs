use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ybar", version, about = "Translucent Wayland status bar")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub conf: Option<PathBuf>,

    /// Center the clock (overrides the config file)
    #[arg(long)]
    pub center_clock: bool,

    /// Center the workspace label (overrides the config file)
    #[arg(long)]
    pub center_workspace: bool,

    /// Enable debug mode with verbose logging in a separate terminal
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Internal command to watch logs via socket (Hidden)
    #[command(hide = true)]
    InternalWatch { socket_path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_overrides() {
        let cli = Cli::parse_from(["ybar", "--conf", "/tmp/bar.toml", "--center-clock", "--debug"]);
        assert_eq!(cli.conf, Some(PathBuf::from("/tmp/bar.toml")));
        assert!(cli.center_clock);
        assert!(!cli.center_workspace);
        assert!(cli.debug);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_internal_watch() {
        let cli = Cli::parse_from(["ybar", "internal-watch", "/run/user/1000/ybar-debug.sock"]);
        match cli.command {
            Some(Commands::InternalWatch { socket_path }) => {
                assert_eq!(socket_path, PathBuf::from("/run/user/1000/ybar-debug.sock"))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
