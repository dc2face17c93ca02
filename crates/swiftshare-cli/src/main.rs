//! SwiftShare CLI - peer-to-peer single-file transfer
//!
//! One side hosts (listens on a port), the other connects to it. Either side
//! may send.
//!
//! ## Quick Start
//!
//! ```bash
//! # Wait for a sender on port 54000
//! swiftshare receive --output ~/Downloads
//!
//! # Send a file to it (on another device)
//! swiftshare send ./notes.txt --host 192.168.1.20
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Send(args) => commands::send::run(args).await,
        Command::Receive(args) => commands::receive::run(args).await,
        Command::History(args) => commands::history::run(args).await,
        Command::Config(args) => commands::config::run(args).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "warn,swiftshare=debug,swiftshare_core=debug"
    } else {
        "warn,swiftshare=info,swiftshare_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
