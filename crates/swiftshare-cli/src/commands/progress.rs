//! Running a session in the terminal.
//!
//! Shows progress from the session's watch channel and turns keyboard input
//! into pause/cancel requests: `p` + Enter toggles pause, `c` + Enter or
//! Ctrl-C cancels.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::{mpsc, watch};

use swiftshare_core::transfer::{
    Role, SessionController, SessionHandle, SessionProgress, SessionState, TransferOutcome,
};

use crate::ui::{format_elapsed, format_size};

/// Drive `handle` to its end, with progress output unless `quiet`.
pub async fn drive(handle: SessionHandle, quiet: bool) -> TransferOutcome {
    let controller = handle.controller().clone();

    let display = (!quiet).then(|| tokio::spawn(display_progress(handle.progress())));
    let controls = io::stdin()
        .is_terminal()
        .then(|| tokio::spawn(read_controls(controller.clone(), quiet)));

    let wait = handle.wait();
    tokio::pin!(wait);

    let finished = tokio::select! {
        outcome = &mut wait => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome,
        None => {
            tracing::info!("Ctrl+C received, cancelling");
            controller.cancel();
            wait.await
        }
    };

    if let Some(controls) = controls {
        controls.abort();
    }
    if let Some(display) = display {
        let _ = display.await;
    }

    outcome
}

/// Print the outcome and turn a failure into an error exit.
pub fn report(outcome: &TransferOutcome, json: bool) -> Result<()> {
    if json {
        let value = match outcome {
            TransferOutcome::Success {
                file_name,
                bytes,
                elapsed_ms,
                saved_to,
            } => serde_json::json!({
                "status": "success",
                "file": file_name,
                "bytes": bytes,
                "elapsed_ms": elapsed_ms,
                "saved_to": saved_to,
            }),
            TransferOutcome::Failure {
                file_name,
                bytes_attempted,
                kind,
                reason,
            } => serde_json::json!({
                "status": "failed",
                "file": file_name,
                "bytes_attempted": bytes_attempted,
                "kind": kind,
                "reason": reason,
            }),
            TransferOutcome::Cancelled => serde_json::json!({ "status": "cancelled" }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    match outcome {
        TransferOutcome::Success {
            file_name,
            bytes,
            elapsed_ms,
            saved_to,
        } => {
            if !json {
                println!(
                    "  {} ({}) transferred in {}",
                    file_name,
                    format_size(*bytes),
                    format_elapsed(Duration::from_millis(*elapsed_ms))
                );
                if let Some(path) = saved_to {
                    println!("  Saved to {}", path.display());
                }
                println!();
            }
            Ok(())
        }
        TransferOutcome::Cancelled => {
            if !json {
                println!("  Transfer cancelled.");
                println!();
            }
            Ok(())
        }
        TransferOutcome::Failure { reason, .. } => bail!("transfer failed: {reason}"),
    }
}

async fn display_progress(mut rx: watch::Receiver<SessionProgress>) {
    let mut last_state = SessionState::Created;
    let mut last_descriptor: Option<String> = None;

    loop {
        let progress = rx.borrow_and_update().clone();

        if progress.descriptor != last_descriptor {
            if let Some(descriptor) = &progress.descriptor {
                println!("  {descriptor}");
                if progress.listening_port.is_some() {
                    println!("  Waiting for a peer to connect...");
                }
            }
            last_descriptor.clone_from(&progress.descriptor);
        }

        if progress.state != last_state {
            let was_paused = last_state == SessionState::Paused;
            last_state = progress.state;

            match progress.state {
                SessionState::Connected => {
                    println!("  Connected.");
                }
                SessionState::Transferring if was_paused => {
                    println!();
                    println!("  Resumed.");
                }
                SessionState::Transferring => {
                    if let Some(name) = &progress.file_name {
                        let verb = match progress.role {
                            Role::Sender => "Sending",
                            Role::Receiver => "Receiving",
                        };
                        println!("  {verb} {name}");
                    }
                    println!("  Type 'p' + Enter to pause, 'c' + Enter to cancel.");
                }
                SessionState::Paused => {
                    println!();
                    println!("  Paused. Type 'p' + Enter to resume.");
                }
                SessionState::Completed | SessionState::Failed | SessionState::Cancelled => {
                    println!();
                    break;
                }
                SessionState::Created | SessionState::Connecting => {}
            }
        }

        if progress.state == SessionState::Transferring {
            print!(
                "\r  [{:>6.2}%] {} / {}    ",
                progress.percentage(),
                format_size(progress.bytes_transferred),
                format_size(progress.total_bytes)
            );
            let _ = io::stdout().flush();
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Read keyboard commands until the session ends.
///
/// Stdin is read on a plain thread so a pending read never holds up runtime
/// shutdown.
async fn read_controls(controller: SessionController, quiet: bool) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = rx.recv().await {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" | "r" | "resume" => {
                if !controller.toggle_pause() && !quiet {
                    println!("  Nothing to pause right now.");
                }
            }
            "c" | "cancel" => {
                controller.cancel();
                break;
            }
            _ => {}
        }
    }
}
