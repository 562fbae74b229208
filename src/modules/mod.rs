pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod listener;
pub mod logging;
pub mod runner;
pub mod watcher;
