//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use swiftshare_core::config::Config;
use swiftshare_core::connection::{parse_remote, validate_port, Endpoint};
use swiftshare_core::history::{HistoryStore, MemoryLog, SharedHistory, TransferLogSink};

/// Load configuration with graceful fallback to defaults.
///
/// If the config file doesn't exist or can't be parsed, it falls back to defaults.
pub fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {e}");
        Config::default()
    })
}

/// Open the transfer log configured for this machine.
///
/// A history file that cannot be loaded is reported and replaced by an
/// in-memory log so the transfer itself still runs.
pub fn open_log(config: &Config) -> Arc<dyn TransferLogSink> {
    match HistoryStore::load(config.history.clone()) {
        Ok(store) => Arc::new(SharedHistory::new(store)),
        Err(e) => {
            tracing::warn!("Transfer history unavailable: {e}");
            Arc::new(MemoryLog::new())
        }
    }
}

/// Turn `--host`/`--port` into an endpoint.
///
/// Without a host this side listens; `--host` may carry its own port.
pub fn resolve_endpoint(
    host: Option<&str>,
    port: Option<u16>,
    config: &Config,
) -> anyhow::Result<Endpoint> {
    let port = port.unwrap_or(config.network.port);
    match host {
        None => Ok(Endpoint::host(validate_port(port)?)),
        Some(host) => {
            let (host, port) = parse_remote(host, port)?;
            Ok(Endpoint::remote(host, validate_port(port)?))
        }
    }
}

pub mod config;
pub mod history;
pub mod progress;
pub mod receive;
pub mod send;

/// SwiftShare - peer-to-peer single-file transfer
#[derive(Parser)]
#[command(name = "swiftshare")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Send a file (listens unless --host is given)
    Send(SendArgs),

    /// Receive a file (listens unless --host is given)
    Receive(ReceiveArgs),

    /// View transfer history
    History(HistoryArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the send command
#[derive(Parser)]
pub struct SendArgs {
    /// File to send
    pub file: PathBuf,

    /// Connect to this receiver (`HOST` or `HOST:PORT`) instead of listening
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on or connect to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the receive command
#[derive(Parser)]
pub struct ReceiveArgs {
    /// Directory to save the file in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Connect to this sender (`HOST` or `HOST:PORT`) instead of listening
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on or connect to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the history command
#[derive(Parser)]
pub struct HistoryArgs {
    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Clear history
    #[arg(long)]
    pub clear: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Reset to defaults
    Reset,
}
