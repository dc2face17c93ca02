//! Common test utilities for `SwiftShare` integration tests.
//!
//! This module provides shared functionality for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;

use swiftshare_core::transfer::{SessionHandle, SessionProgress, TransferOutcome};

/// Upper bound for anything a test waits on.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Assert that two files have identical content.
pub fn assert_files_equal(path1: &Path, path2: &Path) {
    let content1 = std::fs::read(path1).expect("Failed to read first file");
    let content2 = std::fs::read(path2).expect("Failed to read second file");
    assert_eq!(content1, content2, "File contents differ");
}

/// Wait until a host session has bound its port and return it.
pub async fn wait_for_port(progress: &mut watch::Receiver<SessionProgress>) -> u16 {
    let snapshot = tokio::time::timeout(
        TEST_TIMEOUT,
        progress.wait_for(|p| p.listening_port.is_some() || p.state.is_terminal()),
    )
    .await
    .expect("Timed out waiting for listener")
    .expect("Session dropped its progress channel")
    .clone();

    snapshot
        .listening_port
        .unwrap_or_else(|| panic!("Session ended before listening: {}", snapshot.status))
}

/// Wait until `check` holds for the published progress.
pub async fn wait_for_progress<F>(progress: &mut watch::Receiver<SessionProgress>, check: F)
where
    F: FnMut(&SessionProgress) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, progress.wait_for(check))
        .await
        .expect("Timed out waiting for progress")
        .expect("Session dropped its progress channel");
}

/// Wait for a session outcome, failing the test if it hangs.
pub async fn finish(handle: SessionHandle) -> TransferOutcome {
    tokio::time::timeout(TEST_TIMEOUT, handle.wait())
        .await
        .expect("Session did not finish in time")
}
