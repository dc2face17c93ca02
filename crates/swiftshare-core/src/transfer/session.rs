//! One session, one connection, one file.
//!
//! [`TransferSession`] is built in a [`Role`], spawned onto the tokio runtime
//! and then driven only through its [`SessionController`]. Whatever happens,
//! the task ends with exactly one [`TransferOutcome`], one log entry and one
//! [`SessionObserver::on_terminal`] call.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::pump::{pump, PumpProgress};
use super::{Role, SessionProgress, SessionState, TransferOutcome};
use crate::connection::{self, ConnectOptions, Endpoint, HostListener};
use crate::crypto::CipherCodec;
use crate::error::{Error, Result};
use crate::history::{TransferLogEntry, TransferLogSink, TransferStatus};
use crate::protocol::{self, Handshake};

/// Candidate names tried before a receiver gives up on a destination.
pub const MAX_NAME_ATTEMPTS: usize = 64;

const COPY_PREFIX: &str = "copy_";

const PAUSED_PREFIX: &str = "[PAUSED] ";

/// Upper bound on the up-front receive buffer; a peer's size claim is not
/// trusted for allocation.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

const UNKNOWN_FILE: &str = "Unknown";

/// Lifecycle callbacks for code that tracks running sessions.
pub trait SessionObserver: Send + Sync {
    /// Called once, right after the session is spawned.
    fn on_started(&self, _controller: &SessionController) {}

    /// Called once, after the outcome is logged.
    fn on_terminal(&self, _id: Uuid, _outcome: &TransferOutcome) {}
}

/// State shared between a session task and its controllers.
#[derive(Debug)]
struct Control {
    progress: watch::Sender<SessionProgress>,
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl Control {
    fn update(&self, apply: impl FnOnce(&mut SessionProgress)) {
        self.progress.send_modify(apply);
    }

    fn set_state(&self, state: SessionState, status: impl Into<String>) {
        let status = status.into();
        tracing::debug!(?state, %status, "Session state");
        self.update(|p| {
            p.state = state;
            p.status = status;
        });
    }

    fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.update(|p| {
            if p.state == SessionState::Paused {
                p.status = format!("{PAUSED_PREFIX}{status}");
            } else {
                p.status = status;
            }
        });
    }

    fn begin_transfer(&self, file_name: &str, total: u64, status: String) {
        self.update(|p| {
            p.state = SessionState::Transferring;
            p.file_name = Some(file_name.to_string());
            p.bytes_transferred = 0;
            p.total_bytes = total;
            p.status = status;
        });
    }

    fn report(&self, progress: PumpProgress) {
        self.update(|p| p.bytes_transferred = progress.transferred);
    }

    /// Leave the pausable phase once the payload is in.
    fn end_transfer(&self) {
        self.paused.send_replace(false);
        self.update(|p| {
            if p.state == SessionState::Paused {
                p.state = SessionState::Transferring;
                if let Some(status) = p.status.strip_prefix(PAUSED_PREFIX) {
                    p.status = status.to_string();
                }
            }
        });
    }

    /// Flip pause on or off. `None` toggles.
    ///
    /// State and flag change together inside the watch lock, and only while
    /// the payload is moving.
    fn switch_pause(&self, target: Option<bool>) -> bool {
        self.progress.send_if_modified(|p| {
            let pause = match (p.state, target) {
                (SessionState::Transferring, Some(true) | None) => true,
                (SessionState::Paused, Some(false) | None) => false,
                _ => return false,
            };

            if pause {
                p.state = SessionState::Paused;
                p.status = format!("{PAUSED_PREFIX}{}", p.status);
            } else {
                p.state = SessionState::Transferring;
                if let Some(status) = p.status.strip_prefix(PAUSED_PREFIX) {
                    p.status = status.to_string();
                }
            }
            self.paused.send_replace(pause);
            tracing::debug!(paused = pause, "Pause toggled");
            true
        })
    }
}

/// Cloneable remote control for a running session.
#[derive(Debug, Clone)]
pub struct SessionController {
    id: Uuid,
    control: Arc<Control>,
}

impl SessionController {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to progress updates.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<SessionProgress> {
        self.control.progress.subscribe()
    }

    /// Current progress snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionProgress {
        self.control.progress.borrow().clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.control.progress.borrow().state
    }

    /// Hold the payload at the next chunk boundary.
    ///
    /// Returns `false` unless the session was transferring.
    pub fn pause(&self) -> bool {
        self.control.switch_pause(Some(true))
    }

    /// Release a paused payload.
    ///
    /// Returns `false` unless the session was paused.
    pub fn resume(&self) -> bool {
        self.control.switch_pause(Some(false))
    }

    /// Pause a transferring session or resume a paused one.
    ///
    /// Returns `false` in any other state.
    pub fn toggle_pause(&self) -> bool {
        self.control.switch_pause(None)
    }

    /// Cancel the session. Pending I/O is abandoned and the socket closed.
    /// Has no effect once the session has ended.
    pub fn cancel(&self) {
        tracing::debug!(id = %self.id, "Cancel requested");
        self.control.cancel.cancel();
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.control.cancel.is_cancelled()
    }
}

/// A spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    controller: SessionController,
    task: JoinHandle<TransferOutcome>,
}

impl SessionHandle {
    /// Controller for pause, resume and cancel.
    #[must_use]
    pub const fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.controller.id
    }

    /// Subscribe to progress updates.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<SessionProgress> {
        self.controller.progress()
    }

    /// Cancel the session.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> TransferOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Session task ended abnormally: {e}");
                TransferOutcome::Failure {
                    file_name: UNKNOWN_FILE.to_string(),
                    bytes_attempted: 0,
                    kind: "IoError",
                    reason: format!("session task ended abnormally: {e}"),
                }
            }
        }
    }
}

/// A single-file transfer over a single connection.
#[derive(Debug)]
pub struct TransferSession {
    id: Uuid,
    role: Role,
    path: PathBuf,
    endpoint: Endpoint,
    options: ConnectOptions,
    codec: CipherCodec,
}

/// Facts gathered while driving, needed for the outcome and the log entry.
#[derive(Debug, Default)]
struct RunRecord {
    file_name: Option<String>,
    plaintext_bytes: Option<u64>,
    declared_bytes: u64,
    peer: Option<String>,
    connected_at: Option<Instant>,
}

impl RunRecord {
    fn file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_FILE.to_string())
    }

    fn bytes_attempted(&self) -> u64 {
        self.plaintext_bytes.unwrap_or(self.declared_bytes)
    }
}

struct Delivered {
    file_name: String,
    bytes: u64,
    saved_to: Option<PathBuf>,
}

impl TransferSession {
    /// Create a session.
    ///
    /// A sender `path` must be a regular file with a transmittable name, a
    /// receiver `path` an existing directory. Host port 0 binds any free port;
    /// every other port must be in 1025-65535.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the path or endpoint is unusable.
    pub fn new(role: Role, path: PathBuf, endpoint: Endpoint) -> Result<Self> {
        match role {
            Role::Sender => {
                if !path.is_file() {
                    return Err(Error::InvalidInput(format!(
                        "{} is not a readable file",
                        path.display()
                    )));
                }
                protocol::encode_handshake(&file_name_of(&path)?, 0)?;
            }
            Role::Receiver => {
                if !path.is_dir() {
                    return Err(Error::InvalidInput(format!(
                        "{} is not a directory",
                        path.display()
                    )));
                }
            }
        }

        match &endpoint {
            Endpoint::Host { port: 0 } => {}
            Endpoint::Host { port } => {
                connection::validate_port(*port)?;
            }
            Endpoint::Remote { host, port } => {
                if host.trim().is_empty() {
                    return Err(Error::InvalidInput("remote host is empty".to_string()));
                }
                connection::validate_port(*port)?;
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            role,
            path,
            endpoint,
            options: ConnectOptions::default(),
            codec: CipherCodec::default(),
        })
    }

    /// Override socket options.
    #[must_use]
    pub const fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a non-default payload cipher.
    #[must_use]
    pub fn with_codec(mut self, codec: CipherCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Role of this side.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Endpoint this session binds or dials.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Spawn the session onto the current runtime.
    pub fn spawn(self, log: Arc<dyn TransferLogSink>) -> SessionHandle {
        self.spawn_inner(log, None)
    }

    /// Spawn the session and report its lifecycle to `observer`.
    pub fn spawn_observed(
        self,
        log: Arc<dyn TransferLogSink>,
        observer: Arc<dyn SessionObserver>,
    ) -> SessionHandle {
        self.spawn_inner(log, Some(observer))
    }

    fn spawn_inner(
        self,
        log: Arc<dyn TransferLogSink>,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> SessionHandle {
        let (progress, _) = watch::channel(SessionProgress::new(self.role));
        let (paused, _) = watch::channel(false);
        let control = Arc::new(Control {
            progress,
            paused,
            cancel: CancellationToken::new(),
        });
        let controller = SessionController {
            id: self.id,
            control: Arc::clone(&control),
        };

        if let Some(observer) = &observer {
            observer.on_started(&controller);
        }

        let task = tokio::spawn(self.run(control, log, observer));
        SessionHandle { controller, task }
    }

    async fn run(
        self,
        control: Arc<Control>,
        log: Arc<dyn TransferLogSink>,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> TransferOutcome {
        tracing::debug!(id = %self.id, role = %self.role, endpoint = ?self.endpoint, "Session started");

        let mut record = RunRecord::default();
        let result = tokio::select! {
            biased;
            () = control.cancel.cancelled() => Err(Error::Cancelled),
            result = self.drive(&control, &mut record) => result,
        };

        let outcome = self.conclude(result, &control, &record);
        record_entry(log, self.log_entry(&record, &outcome)).await;

        let (state, status) = match &outcome {
            TransferOutcome::Success { file_name, .. } => {
                tracing::info!(file = %file_name, "Transfer complete");
                (SessionState::Completed, "Transfer complete.".to_string())
            }
            TransferOutcome::Failure { reason, .. } => {
                (SessionState::Failed, format!("Error: {reason}"))
            }
            TransferOutcome::Cancelled => {
                tracing::info!(id = %self.id, "Transfer cancelled");
                (SessionState::Cancelled, "Cancelled.".to_string())
            }
        };
        control.paused.send_replace(false);
        control.set_state(state, status);

        if let Some(observer) = observer {
            observer.on_terminal(self.id, &outcome);
        }
        outcome
    }

    fn conclude(
        &self,
        result: Result<Delivered>,
        control: &Control,
        record: &RunRecord,
    ) -> TransferOutcome {
        match result {
            Ok(delivered) => TransferOutcome::Success {
                file_name: delivered.file_name,
                bytes: delivered.bytes,
                elapsed_ms: record.connected_at.map_or(0, |at| {
                    u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX)
                }),
                saved_to: delivered.saved_to,
            },
            Err(Error::Cancelled) => TransferOutcome::Cancelled,
            Err(e) if control.cancel.is_cancelled() => {
                tracing::debug!("Error after cancel: {e}");
                TransferOutcome::Cancelled
            }
            Err(e) => {
                tracing::warn!(id = %self.id, kind = e.kind(), "Transfer failed: {e}");
                TransferOutcome::Failure {
                    file_name: record.file_name(),
                    bytes_attempted: record.bytes_attempted(),
                    kind: e.kind(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn log_entry(&self, record: &RunRecord, outcome: &TransferOutcome) -> TransferLogEntry {
        let local = if self.endpoint.is_host() {
            "Host"
        } else {
            "Client"
        };
        let remote = record.peer.clone().unwrap_or_else(|| match &self.endpoint {
            Endpoint::Host { .. } => "Client".to_string(),
            Endpoint::Remote { host, port } => format!("{host}:{port}"),
        });
        let (sender, receiver) = match self.role {
            Role::Sender => (local.to_string(), remote),
            Role::Receiver => (remote, local.to_string()),
        };

        let (file_name, size, status) = match outcome {
            TransferOutcome::Success {
                file_name, bytes, ..
            } => (file_name.clone(), *bytes, TransferStatus::Success),
            TransferOutcome::Failure {
                file_name,
                bytes_attempted,
                reason,
                ..
            } => (
                file_name.clone(),
                *bytes_attempted,
                TransferStatus::Failed(reason.clone()),
            ),
            TransferOutcome::Cancelled => (
                record.file_name(),
                record.bytes_attempted(),
                TransferStatus::Cancelled,
            ),
        };

        TransferLogEntry::new(file_name, sender, receiver, size, status)
    }

    async fn drive(&self, control: &Control, record: &mut RunRecord) -> Result<Delivered> {
        control.set_state(SessionState::Connecting, "Connecting...");

        let stream = match &self.endpoint {
            Endpoint::Host { port } => {
                let listener = HostListener::bind(*port).await?;
                let bound = listener.port();
                control.update(|p| {
                    p.descriptor = Some(Endpoint::host(bound).descriptor());
                    p.listening_port = Some(bound);
                    p.status = "Waiting...".to_string();
                });
                tracing::info!(port = bound, "Waiting for peer");

                let (stream, peer) = listener.accept_one().await?;
                record.peer = Some(peer.to_string());
                stream
            }
            Endpoint::Remote { host, port } => {
                let stream =
                    connection::connect(host, *port, self.options.connect_timeout).await?;
                control.update(|p| p.descriptor = Some(self.endpoint.descriptor()));
                record.peer = Some(format!("{host}:{port}"));
                stream
            }
        };

        if self.options.keepalive {
            if let Err(e) = connection::configure_tcp_keepalive(&stream) {
                tracing::warn!("Failed to enable TCP keep-alive: {e}");
            }
        }

        record.connected_at = Some(Instant::now());
        control.set_state(SessionState::Connected, "Connected");

        match self.role {
            Role::Sender => self.send(stream, control, record).await,
            Role::Receiver => self.receive(stream, control, record).await,
        }
    }

    async fn send(
        &self,
        mut stream: TcpStream,
        control: &Control,
        record: &mut RunRecord,
    ) -> Result<Delivered> {
        let file_name = file_name_of(&self.path)?;
        record.file_name = Some(file_name.clone());

        let plaintext = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::filesystem(&self.path, &e))?;
        let plain_len = plaintext.len() as u64;
        record.plaintext_bytes = Some(plain_len);

        control.set_status(format!("Encrypting '{file_name}'..."));
        let codec = self.codec.clone();
        let ciphertext = tokio::task::spawn_blocking(move || codec.encrypt(&plaintext))
            .await
            .map_err(|e| Error::Cipher(format!("encryption task failed: {e}")))?;
        let total = ciphertext.len() as u64;
        record.declared_bytes = total;

        protocol::write_handshake(&mut stream, &Handshake::new(&file_name, total)).await?;
        tracing::info!(file = %file_name, bytes = plain_len, wire_bytes = total, "Sending");

        control.begin_transfer(
            &file_name,
            total,
            format!("Encrypting and sending '{file_name}'..."),
        );
        let mut paused = control.paused.subscribe();
        let sent = pump(ciphertext.as_slice(), &mut stream, total, &mut paused, |p| {
            control.report(p);
        })
        .await?;
        control.end_transfer();

        if sent < total {
            return Err(Error::truncated(sent, total));
        }

        control.set_status("File sent successfully.");
        Ok(Delivered {
            file_name,
            bytes: plain_len,
            saved_to: None,
        })
    }

    async fn receive(
        &self,
        stream: TcpStream,
        control: &Control,
        record: &mut RunRecord,
    ) -> Result<Delivered> {
        let mut reader = BufReader::new(stream);

        control.set_status("Waiting for handshake...");
        let handshake = protocol::read_handshake(&mut reader).await?;
        record.file_name = Some(handshake.file_name.clone());
        record.declared_bytes = handshake.size;
        tracing::info!(file = %handshake.file_name, wire_bytes = handshake.size, "Incoming file");

        let (path, mut file) = reserve_destination(&self.path, &handshake.file_name).await?;
        let saved_name = path
            .file_name()
            .and_then(OsStr::to_str)
            .map_or_else(|| handshake.file_name.clone(), ToString::to_string);
        record.file_name = Some(saved_name.clone());

        control.begin_transfer(
            &saved_name,
            handshake.size,
            format!("Receiving and decrypting '{saved_name}'..."),
        );
        let capacity = usize::try_from(handshake.size).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC));
        let mut ciphertext = Vec::with_capacity(capacity);
        let mut paused = control.paused.subscribe();
        let received = pump(
            &mut reader,
            &mut ciphertext,
            handshake.size,
            &mut paused,
            |p| control.report(p),
        )
        .await?;
        control.end_transfer();
        drop(reader);

        if received < handshake.size {
            return Err(Error::truncated(received, handshake.size));
        }

        control.set_status(format!("Decrypting '{saved_name}'..."));
        let codec = self.codec.clone();
        let plaintext = tokio::task::spawn_blocking(move || codec.decrypt(&ciphertext))
            .await
            .map_err(|e| Error::Cipher(format!("decryption task failed: {e}")))??;
        record.plaintext_bytes = Some(plaintext.len() as u64);

        write_file(&mut file, &path, &plaintext).await?;
        control.set_status("Decryption complete.");

        Ok(Delivered {
            file_name: saved_name,
            bytes: plaintext.len() as u64,
            saved_to: Some(path),
        })
    }
}

/// Create a new, empty file for `file_name` inside `dir`.
///
/// When the name is taken, `copy_` is prefixed again and again
/// (`copy_notes.txt`, `copy_copy_notes.txt`, ...). Creation is atomic, so two
/// receivers never get the same path.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if a candidate cannot be created for any
/// reason other than already existing, or if [`MAX_NAME_ATTEMPTS`] candidates
/// are all taken.
pub async fn reserve_destination(dir: &Path, file_name: &str) -> Result<(PathBuf, File)> {
    let mut candidate = file_name.to_string();

    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(&candidate);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                tracing::debug!(path = %path.display(), "Reserved destination");
                return Ok((path, file));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = format!("{COPY_PREFIX}{candidate}");
            }
            Err(e) => return Err(Error::filesystem(&path, &e)),
        }
    }

    Err(Error::Filesystem(format!(
        "no free name for '{file_name}' in {} after {MAX_NAME_ATTEMPTS} attempts",
        dir.display()
    )))
}

async fn write_file(file: &mut File, path: &Path, contents: &[u8]) -> Result<()> {
    file.write_all(contents)
        .await
        .map_err(|e| Error::filesystem(path, &e))?;
    file.flush().await.map_err(|e| Error::filesystem(path, &e))?;
    file.sync_all()
        .await
        .map_err(|e| Error::filesystem(path, &e))
}

async fn record_entry(log: Arc<dyn TransferLogSink>, entry: TransferLogEntry) {
    match tokio::task::spawn_blocking(move || log.record(entry)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Failed to record transfer: {e}"),
        Err(e) => tracing::warn!("Transfer log task failed: {e}"),
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} has no usable file name", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryLog;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reserve_free_name() {
        let dir = TempDir::new().unwrap();
        let (path, _file) = reserve_destination(dir.path(), "x.txt").await.unwrap();
        assert_eq!(path, dir.path().join("x.txt"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_reserve_one_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"old").unwrap();

        let (path, _file) = reserve_destination(dir.path(), "x.txt").await.unwrap();
        assert_eq!(path, dir.path().join("copy_x.txt"));
        assert_eq!(std::fs::read(dir.path().join("x.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_reserve_two_collisions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("copy_x.txt"), b"b").unwrap();

        let (path, _file) = reserve_destination(dir.path(), "x.txt").await.unwrap();
        assert_eq!(path, dir.path().join("copy_copy_x.txt"));
    }

    #[tokio::test]
    async fn test_reserve_gives_up() {
        let dir = TempDir::new().unwrap();
        let mut name = "y".to_string();
        for _ in 0..MAX_NAME_ATTEMPTS {
            std::fs::write(dir.path().join(&name), b"").unwrap();
            name = format!("copy_{name}");
        }

        let result = reserve_destination(dir.path(), "y").await;
        assert!(matches!(result, Err(Error::Filesystem(_))));
    }

    #[tokio::test]
    async fn test_reserve_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let result = reserve_destination(&missing, "x.txt").await;
        assert!(matches!(result, Err(Error::Filesystem(_))));
    }

    #[test]
    fn test_new_validates_role_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hi").unwrap();

        assert!(TransferSession::new(Role::Sender, file.clone(), Endpoint::host(54000)).is_ok());
        assert!(
            TransferSession::new(Role::Receiver, dir.path().to_path_buf(), Endpoint::host(54000))
                .is_ok()
        );

        assert!(matches!(
            TransferSession::new(Role::Sender, dir.path().to_path_buf(), Endpoint::host(54000)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            TransferSession::new(Role::Receiver, file, Endpoint::host(54000)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_rejects_name_the_receiver_would_refuse() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a\\b.txt");
        std::fs::write(&file, b"payload").unwrap();

        assert!(matches!(
            TransferSession::new(Role::Sender, file, Endpoint::remote("127.0.0.1", 54000)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_new_validates_endpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        assert!(TransferSession::new(Role::Receiver, path.clone(), Endpoint::host(0)).is_ok());
        assert!(TransferSession::new(Role::Receiver, path.clone(), Endpoint::host(80)).is_err());
        assert!(
            TransferSession::new(Role::Receiver, path.clone(), Endpoint::remote(" ", 54000))
                .is_err()
        );
        assert!(
            TransferSession::new(Role::Receiver, path, Endpoint::remote("10.0.0.2", 1024))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_pause_rejected_while_waiting() {
        let dir = TempDir::new().unwrap();
        let session =
            TransferSession::new(Role::Receiver, dir.path().to_path_buf(), Endpoint::host(0))
                .unwrap();
        let log = Arc::new(MemoryLog::new());
        let handle = session.spawn(log.clone());

        let mut progress = handle.progress();
        tokio::time::timeout(
            Duration::from_secs(5),
            progress.wait_for(|p| p.listening_port.is_some()),
        )
        .await
        .unwrap()
        .unwrap();

        let controller = handle.controller().clone();
        assert!(!controller.pause());
        assert!(!controller.toggle_pause());
        assert_eq!(controller.state(), SessionState::Connecting);

        controller.cancel();
        let outcome = handle.wait().await;
        assert_eq!(outcome, TransferOutcome::Cancelled);
        assert!(!controller.resume());
        assert_eq!(controller.state(), SessionState::Cancelled);

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, TransferStatus::Cancelled);
        assert_eq!(entries[0].file_name, "Unknown");
        assert_eq!(entries[0].receiver, "Host");
    }

    #[tokio::test]
    async fn test_cancel_before_first_poll() {
        let dir = TempDir::new().unwrap();
        let session =
            TransferSession::new(Role::Receiver, dir.path().to_path_buf(), Endpoint::host(0))
                .unwrap();
        let log = Arc::new(MemoryLog::new());
        let handle = session.spawn(log.clone());
        handle.cancel();

        assert_eq!(handle.wait().await, TransferOutcome::Cancelled);
        assert_eq!(log.entries().len(), 1);
    }
}
