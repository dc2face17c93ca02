//! File transfer engine for SwiftShare.
//!
//! A [`TransferSession`] moves exactly one file over one TCP connection:
//!
//! - Establishing the connection (host or client side)
//! - Handshake line carrying file name and payload size
//! - Chunked, pausable payload copy
//! - Exactly one terminal outcome and one log entry
//!
//! ## Session Flow
//!
//! ```text
//! Created → Connecting → Connected → Transferring ⇄ Paused
//!                                          │
//!                  Completed | Failed | Cancelled
//! ```
//!
//! The sender encrypts the whole file up front and announces the ciphertext
//! length; the receiver collects exactly that many bytes before decrypting
//! and writing the file under a collision-free name.

pub mod pump;
pub mod registry;
pub mod session;

pub use pump::{pump, PumpProgress};
pub use registry::{ActiveTransfer, TransferRegistry};
pub use session::{
    reserve_destination, SessionController, SessionHandle, SessionObserver, TransferSession,
    MAX_NAME_ATTEMPTS,
};

use std::path::PathBuf;

/// Which way the file flows for this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Reads a local file and sends it
    Sender,
    /// Receives a file into a local directory
    Receiver,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sender => write!(f, "Sender"),
            Self::Receiver => write!(f, "Receiver"),
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built but not started
    Created,
    /// Binding/accepting or dialing
    Connecting,
    /// Socket established
    Connected,
    /// Payload is moving
    Transferring,
    /// Payload held at a chunk boundary
    Paused,
    /// File delivered
    Completed,
    /// Ended with an error
    Failed,
    /// Ended by the caller
    Cancelled,
}

impl SessionState {
    /// Whether no further transition can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Snapshot published by a running session.
#[derive(Debug, Clone)]
pub struct SessionProgress {
    /// Current state
    pub state: SessionState,
    /// Which side of the transfer this is
    pub role: Role,
    /// Connection description, set once the endpoint is bound or dialed
    pub descriptor: Option<String>,
    /// Port actually bound by a host session
    pub listening_port: Option<u16>,
    /// Human-readable status line
    pub status: String,
    /// File being transferred, once known
    pub file_name: Option<String>,
    /// Payload bytes moved so far
    pub bytes_transferred: u64,
    /// Payload bytes announced in the handshake
    pub total_bytes: u64,
}

impl SessionProgress {
    fn new(role: Role) -> Self {
        Self {
            state: SessionState::Created,
            role,
            descriptor: None,
            listening_port: None,
            status: "Starting...".to_string(),
            file_name: None,
            bytes_transferred: 0,
            total_bytes: 0,
        }
    }

    /// Payload fraction moved, in `[0, 1]`.
    ///
    /// Zero until the payload starts moving; from then on it matches
    /// [`PumpProgress::fraction`], so an empty payload counts as done.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.state {
            SessionState::Transferring | SessionState::Paused | SessionState::Completed => {
                PumpProgress {
                    transferred: self.bytes_transferred,
                    total: self.total_bytes,
                }
                .fraction()
            }
            _ => 0.0,
        }
    }

    /// Payload progress as a percentage (0.0 - 100.0).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The file was delivered
    Success {
        /// Name of the file (the final on-disk name for a receiver)
        file_name: String,
        /// Plaintext bytes delivered
        bytes: u64,
        /// Time from connection to completion
        elapsed_ms: u64,
        /// Where a receiver saved the file
        saved_to: Option<PathBuf>,
    },
    /// The session failed
    Failure {
        /// Name of the file, or `Unknown` before the handshake
        file_name: String,
        /// Bytes the session was trying to move
        bytes_attempted: u64,
        /// Stable error kind, see [`crate::Error::kind`]
        kind: &'static str,
        /// Human-readable reason
        reason: String,
    },
    /// The caller cancelled the session
    Cancelled,
}

impl TransferOutcome {
    /// Whether the file was delivered.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The terminal state this outcome corresponds to.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        match self {
            Self::Success { .. } => SessionState::Completed,
            Self::Failure { .. } => SessionState::Failed,
            Self::Cancelled => SessionState::Cancelled,
        }
    }
}
