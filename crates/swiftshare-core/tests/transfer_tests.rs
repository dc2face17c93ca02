//! End-to-end tests for transfer sessions over loopback TCP.
//!
//! Both ends run as real sessions where possible; a raw socket stands in for
//! a peer when the test needs to misbehave on purpose.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use swiftshare_core::config::HistoryConfig;
use swiftshare_core::connection::Endpoint;
use swiftshare_core::crypto;
use swiftshare_core::history::{HistoryStore, MemoryLog, SharedHistory, TransferStatus};
use swiftshare_core::protocol::{self, Handshake};
use swiftshare_core::transfer::{Role, SessionState, TransferOutcome, TransferSession};

use common::{
    assert_files_equal, create_temp_dir, create_test_file, finish, random_bytes,
    wait_for_port, wait_for_progress,
};

/// Receiver hosts, sender connects.
#[tokio::test]
async fn test_loopback_transfer_notes() {
    let src = create_temp_dir();
    let dst = create_temp_dir();
    let source = create_test_file(src.path(), "notes.txt", &random_bytes(1024));

    let receiver_log = Arc::new(MemoryLog::new());
    let sender_log = Arc::new(MemoryLog::new());

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(receiver_log.clone());
    let mut progress = receiver.progress();
    let port = wait_for_port(&mut progress).await;
    assert_eq!(
        progress.borrow().descriptor.as_deref(),
        Some(format!("Host Connection @localhost:{port}").as_str())
    );

    let sender = TransferSession::new(Role::Sender, source.clone(), Endpoint::remote("127.0.0.1", port))
        .unwrap()
        .spawn(sender_log.clone());

    let sent = finish(sender).await;
    let received = finish(receiver).await;

    match &sent {
        TransferOutcome::Success {
            file_name,
            bytes,
            saved_to,
            ..
        } => {
            assert_eq!(file_name, "notes.txt");
            assert_eq!(*bytes, 1024);
            assert!(saved_to.is_none());
        }
        other => panic!("sender did not succeed: {other:?}"),
    }

    let saved = match &received {
        TransferOutcome::Success {
            file_name,
            bytes,
            saved_to: Some(saved),
            ..
        } => {
            assert_eq!(file_name, "notes.txt");
            assert_eq!(*bytes, 1024);
            saved.clone()
        }
        other => panic!("receiver did not succeed: {other:?}"),
    };
    assert_eq!(saved, dst.path().join("notes.txt"));
    assert_files_equal(&source, &saved);

    for log in [&sender_log, &receiver_log] {
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, TransferStatus::Success);
        assert_eq!(entries[0].size_bytes, 1024);
        assert_eq!(entries[0].file_name, "notes.txt");
    }

    let receiver_entry = &receiver_log.entries()[0];
    assert_eq!(receiver_entry.receiver, "Host");
    assert!(receiver_entry.sender.starts_with("127.0.0.1:"));
    let sender_entry = &sender_log.entries()[0];
    assert_eq!(sender_entry.sender, "Client");
    assert_eq!(sender_entry.receiver, format!("127.0.0.1:{port}"));

    let last = progress.borrow().clone();
    assert_eq!(last.state, SessionState::Completed);
    assert!((last.fraction() - 1.0).abs() < f64::EPSILON);
}

/// Sender hosts, receiver connects; existing file is not overwritten.
#[tokio::test]
async fn test_reverse_roles_with_collision() {
    let src = create_temp_dir();
    let dst = create_temp_dir();
    let content = random_bytes(100 * 1024 + 7);
    let source = create_test_file(src.path(), "photo.jpg", &content);
    create_test_file(dst.path(), "photo.jpg", b"keep me");

    let sender = TransferSession::new(Role::Sender, source, Endpoint::host(0))
        .unwrap()
        .spawn(Arc::new(MemoryLog::new()));
    let port = wait_for_port(&mut sender.progress()).await;

    let receiver = TransferSession::new(
        Role::Receiver,
        dst.path().to_path_buf(),
        Endpoint::remote("127.0.0.1", port),
    )
    .unwrap()
    .spawn(Arc::new(MemoryLog::new()));

    assert!(finish(sender).await.is_success());
    let outcome = finish(receiver).await;

    let TransferOutcome::Success {
        file_name,
        saved_to: Some(saved),
        ..
    } = outcome
    else {
        panic!("receiver did not succeed: {outcome:?}");
    };
    assert_eq!(file_name, "copy_photo.jpg");
    assert_eq!(saved, dst.path().join("copy_photo.jpg"));
    assert_eq!(std::fs::read(&saved).unwrap(), content);
    assert_eq!(
        std::fs::read(dst.path().join("photo.jpg")).unwrap(),
        b"keep me"
    );
}

/// The handshake announces the ciphertext length, then exactly that many bytes follow.
#[tokio::test]
async fn test_sender_wire_format() {
    let src = create_temp_dir();
    let plaintext = random_bytes(1024);
    let source = create_test_file(src.path(), "notes.txt", &plaintext);

    let sender = TransferSession::new(Role::Sender, source, Endpoint::host(0))
        .unwrap()
        .spawn(Arc::new(MemoryLog::new()));
    let port = wait_for_port(&mut sender.progress()).await;

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut reader = BufReader::new(stream);
    let handshake = protocol::read_handshake(&mut reader).await.unwrap();
    assert_eq!(handshake, Handshake::new("notes.txt", 1040));

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload).await.unwrap();
    assert_eq!(payload.len(), 1040);
    assert_eq!(crypto::decrypt(&payload).unwrap(), plaintext);

    assert!(finish(sender).await.is_success());
}

/// A peer that declares N bytes and sends N/2 ends the session as failed.
#[tokio::test]
async fn test_truncated_payload_fails() {
    let dst = create_temp_dir();
    let log = Arc::new(MemoryLog::new());

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(log.clone());
    let port = wait_for_port(&mut receiver.progress()).await;

    let ciphertext = crypto::encrypt(&random_bytes(4096));
    let declared = ciphertext.len() as u64;
    let mut peer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    protocol::write_handshake(&mut peer, &Handshake::new("big.bin", declared))
        .await
        .unwrap();
    peer.write_all(&ciphertext[..ciphertext.len() / 2]).await.unwrap();
    peer.shutdown().await.unwrap();
    drop(peer);

    let outcome = finish(receiver).await;
    let TransferOutcome::Failure {
        file_name,
        bytes_attempted,
        kind,
        ..
    } = outcome
    else {
        panic!("truncated transfer did not fail: {outcome:?}");
    };
    assert_eq!(file_name, "big.bin");
    assert_eq!(bytes_attempted, declared);
    assert_eq!(kind, "IoError");

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0].status, TransferStatus::Failed(_)));
    assert!(entries.iter().all(|e| e.status != TransferStatus::Success));
}

#[tokio::test]
async fn test_malformed_handshake_fails() {
    let dst = create_temp_dir();
    let log = Arc::new(MemoryLog::new());

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(log.clone());
    let port = wait_for_port(&mut receiver.progress()).await;

    let mut peer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    peer.write_all(b"notes.txt 1040\n").await.unwrap();

    let outcome = finish(receiver).await;
    assert!(
        matches!(
            outcome,
            TransferOutcome::Failure {
                kind: "MalformedHandshakeError",
                ..
            }
        ),
        "{outcome:?}"
    );
    assert_eq!(log.entries()[0].file_name, "Unknown");
    assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_undecryptable_payload_fails() {
    let dst = create_temp_dir();

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(Arc::new(MemoryLog::new()));
    let port = wait_for_port(&mut receiver.progress()).await;

    let mut peer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    protocol::write_handshake(&mut peer, &Handshake::new("odd.bin", 20))
        .await
        .unwrap();
    peer.write_all(&[7u8; 20]).await.unwrap();

    let outcome = finish(receiver).await;
    assert!(
        matches!(
            outcome,
            TransferOutcome::Failure {
                kind: "CipherError",
                ..
            }
        ),
        "{outcome:?}"
    );
    // The reserved destination stays behind, empty.
    assert_eq!(std::fs::read(dst.path().join("odd.bin")).unwrap().len(), 0);
}

/// Pause holds the payload at a chunk boundary even while bytes keep arriving.
#[tokio::test]
async fn test_pause_and_resume_receiver() {
    let dst = create_temp_dir();
    let plaintext = random_bytes(100 * 1024);
    let ciphertext = crypto::encrypt(&plaintext);
    let total = ciphertext.len() as u64;

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(Arc::new(MemoryLog::new()));
    let controller = receiver.controller().clone();
    let mut progress = receiver.progress();
    let port = wait_for_port(&mut progress).await;

    let mut peer = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    protocol::write_handshake(&mut peer, &Handshake::new("big.bin", total))
        .await
        .unwrap();
    peer.write_all(&ciphertext[..16 * 1024]).await.unwrap();
    peer.flush().await.unwrap();

    wait_for_progress(&mut progress, |p| p.bytes_transferred >= 16 * 1024).await;
    assert!(controller.pause());
    assert_eq!(controller.state(), SessionState::Paused);
    assert!(progress.borrow().status.starts_with("[PAUSED]"));

    peer.write_all(&ciphertext[16 * 1024..]).await.unwrap();
    peer.flush().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let held = controller.snapshot().bytes_transferred;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(controller.snapshot().bytes_transferred, held);
    assert!(held < total);
    assert_eq!(controller.state(), SessionState::Paused);

    assert!(controller.toggle_pause());
    let outcome = finish(receiver).await;
    let TransferOutcome::Success {
        saved_to: Some(saved),
        ..
    } = outcome
    else {
        panic!("resumed transfer did not succeed: {outcome:?}");
    };
    assert_eq!(std::fs::read(saved).unwrap(), plaintext);
    drop(peer);
}

/// Cancelling a host that is still accepting releases its port.
#[tokio::test]
async fn test_cancel_while_accepting() {
    let dst = create_temp_dir();
    let log = Arc::new(MemoryLog::new());

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(log.clone());
    let port = wait_for_port(&mut receiver.progress()).await;

    receiver.cancel();
    assert_eq!(finish(receiver).await, TransferOutcome::Cancelled);

    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, TransferStatus::Cancelled);

    TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("port should be free after cancel");
}

/// Cancelling a connected receiver closes its socket.
#[tokio::test]
async fn test_cancel_while_reading() {
    let dst = create_temp_dir();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let receiver = TransferSession::new(
        Role::Receiver,
        dst.path().to_path_buf(),
        Endpoint::remote("127.0.0.1", port),
    )
    .unwrap()
    .spawn(Arc::new(MemoryLog::new()));

    let (mut peer, _) = listener.accept().await.unwrap();
    let mut progress = receiver.progress();
    wait_for_progress(&mut progress, |p| p.state == SessionState::Connected).await;

    receiver.cancel();
    assert_eq!(finish(receiver).await, TransferOutcome::Cancelled);

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), peer.read(&mut buf))
        .await
        .expect("peer socket was not closed")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

/// Cancelling a client that is still dialing ends promptly.
#[tokio::test]
async fn test_cancel_while_connecting() {
    let src = create_temp_dir();
    let source = create_test_file(src.path(), "a.txt", b"hello");

    // Non-routable address: the connect either hangs or fails fast.
    let sender = TransferSession::new(Role::Sender, source, Endpoint::remote("10.255.255.1", 54000))
        .unwrap()
        .spawn(Arc::new(MemoryLog::new()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sender.cancel();

    let outcome = finish(sender).await;
    assert!(
        matches!(
            outcome,
            TransferOutcome::Cancelled
                | TransferOutcome::Failure {
                    kind: "ConnectionError",
                    ..
                }
        ),
        "{outcome:?}"
    );
}

#[tokio::test]
async fn test_connect_refused_fails() {
    let src = create_temp_dir();
    let source = create_test_file(src.path(), "a.txt", b"hello");
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let log = Arc::new(MemoryLog::new());
    let sender = TransferSession::new(Role::Sender, source, Endpoint::remote("127.0.0.1", port))
        .unwrap()
        .spawn(log.clone());

    let outcome = finish(sender).await;
    assert!(
        matches!(
            outcome,
            TransferOutcome::Failure {
                kind: "ConnectionError",
                ..
            }
        ),
        "{outcome:?}"
    );
    assert_eq!(log.entries().len(), 1);
    assert_eq!(log.entries()[0].size_bytes, 0);
}

/// Sessions logging into a shared history file.
#[tokio::test]
async fn test_history_file_records_both_sides() {
    let src = create_temp_dir();
    let dst = create_temp_dir();
    let data = create_temp_dir();
    let source = create_test_file(src.path(), "report.pdf", &random_bytes(3000));
    let history_path = data.path().join("history.json");

    let store = HistoryStore::load_from(history_path.clone(), HistoryConfig::default()).unwrap();
    let history = Arc::new(SharedHistory::new(store));

    let receiver =
        TransferSession::new(Role::Receiver, dst.path().to_path_buf(), Endpoint::host(0))
            .unwrap()
            .spawn(history.clone());
    let port = wait_for_port(&mut receiver.progress()).await;
    let sender = TransferSession::new(Role::Sender, source, Endpoint::remote("127.0.0.1", port))
        .unwrap()
        .spawn(history.clone());

    assert!(finish(sender).await.is_success());
    assert!(finish(receiver).await.is_success());

    let reloaded = HistoryStore::load_from(history_path, HistoryConfig::default()).unwrap();
    assert_eq!(reloaded.len(), 2);
    for entry in reloaded.list(None) {
        assert_eq!(entry.file_name, "report.pdf");
        assert_eq!(entry.size_bytes, 3000);
        assert_eq!(entry.status, TransferStatus::Success);
    }
}
