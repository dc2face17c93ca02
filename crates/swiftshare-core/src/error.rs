//! Error types for SwiftShare.
//!
//! Every failure inside a transfer session is expressed as one of these
//! variants before it is turned into a terminal outcome.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for SwiftShare operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for SwiftShare.
#[derive(Error, Debug)]
pub enum Error {
    /// Bind, listen, accept or connect failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Handshake line had the wrong shape
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    /// Encryption or decryption failed
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Destination unwritable, source unreadable or no free file name
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Socket closed or payload cut short
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transfer was cancelled by the caller
    #[error("transfer cancelled")]
    Cancelled,

    /// Caller supplied an unusable value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Short, stable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "ConnectionError",
            Self::MalformedHandshake(_) => "MalformedHandshakeError",
            Self::Cipher(_) => "CipherError",
            Self::Filesystem(_) => "FilesystemError",
            Self::Io(_) => "IoError",
            Self::Cancelled => "Cancelled",
            Self::InvalidInput(_) => "InvalidInput",
            Self::ConfigError(_) => "ConfigError",
        }
    }

    /// Build an `Io` error for a payload that ended before its declared size.
    #[must_use]
    pub fn truncated(received: u64, expected: u64) -> Self {
        Self::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("payload truncated: received {received} of {expected} bytes"),
        ))
    }

    /// Wrap a filesystem failure with the path it concerns.
    #[must_use]
    pub fn filesystem(path: &std::path::Path, err: &io::Error) -> Self {
        Self::Filesystem(format!("{}: {err}", path.display()))
    }
}
