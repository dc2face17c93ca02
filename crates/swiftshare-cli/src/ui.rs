//! UI utilities for SwiftShare CLI.

use std::time::Duration;

/// Print the banner shown at the top of a transfer.
pub fn print_header() {
    println!();
    println!("SwiftShare v{}", swiftshare_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();
}

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format an elapsed time as "1.2s" or "M:SS".
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    if total_secs < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// Cut `text` to at most `width` characters, marking the cut with "...".
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
