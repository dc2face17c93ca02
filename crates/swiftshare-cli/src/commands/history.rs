//! History command implementation.

use anyhow::Result;

use swiftshare_core::history::HistoryStore;

use super::HistoryArgs;
use crate::ui::{format_size, truncate};

/// Run the history command.
pub async fn run(args: HistoryArgs) -> Result<()> {
    let config = super::load_config();
    let mut store = HistoryStore::load(config.history)?;

    if args.clear {
        store.clear()?;
        println!("  Transfer history cleared.");
        return Ok(());
    }

    let entries = store.list(args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("  No transfers recorded yet.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<19}  {:<24}  {:>9}  {:<21}  {:<21}  Status",
        "When", "File", "Size", "Sender", "Receiver"
    );
    println!("  {}", "-".repeat(112));
    for entry in entries {
        println!(
            "  {:<19}  {:<24}  {:>9}  {:<21}  {:<21}  {}",
            entry.formatted_timestamp(),
            truncate(&entry.file_name, 24),
            format_size(entry.size_bytes),
            truncate(&entry.sender, 21),
            truncate(&entry.receiver, 21),
            entry.status
        );
    }
    println!();
    println!(
        "  {} of {} entries, stored at {}",
        entries.len(),
        store.len(),
        store.path().display()
    );

    Ok(())
}
