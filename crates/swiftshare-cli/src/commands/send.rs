//! Send command implementation.

use anyhow::{bail, Result};

use swiftshare_core::transfer::{Role, TransferSession};

use super::progress;
use super::SendArgs;
use crate::ui;

/// Run the send command.
pub async fn run(args: SendArgs) -> Result<()> {
    let config = super::load_config();

    if !args.file.is_file() {
        bail!("{} is not a file", args.file.display());
    }

    let endpoint = super::resolve_endpoint(args.host.as_deref(), args.port, &config)?;
    let session = TransferSession::new(Role::Sender, args.file.clone(), endpoint)?
        .with_options(config.network.connect_options());

    if !args.quiet && !args.json {
        ui::print_header();
        let name = args.file.file_name().unwrap_or(args.file.as_os_str());
        println!("  Sending {}", name.to_string_lossy());
        println!();
    }

    let handle = session.spawn(super::open_log(&config));
    let outcome = progress::drive(handle, args.quiet || args.json).await;
    progress::report(&outcome, args.json)
}
