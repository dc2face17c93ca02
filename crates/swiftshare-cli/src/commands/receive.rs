//! Receive command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};

use swiftshare_core::transfer::{Role, TransferSession};

use super::progress;
use super::ReceiveArgs;
use crate::ui;

/// Run the receive command.
pub async fn run(args: ReceiveArgs) -> Result<()> {
    let config = super::load_config();

    let output_dir = args
        .output
        .or_else(|| config.transfer.default_output.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    if !output_dir.is_dir() {
        bail!("output directory {} does not exist", output_dir.display());
    }

    let endpoint = super::resolve_endpoint(args.host.as_deref(), args.port, &config)?;
    let session = TransferSession::new(Role::Receiver, output_dir.clone(), endpoint)?
        .with_options(config.network.connect_options());

    if !args.quiet && !args.json {
        ui::print_header();
        println!("  Saving into {}", output_dir.display());
        println!();
    }

    let handle = session.spawn(super::open_log(&config));
    let outcome = progress::drive(handle, args.quiet || args.json).await;
    progress::report(&outcome, args.json)
}
