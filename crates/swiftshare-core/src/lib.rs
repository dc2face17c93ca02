//! # SwiftShare Core Library
//!
//! `swiftshare-core` moves one file between two peers over a plain TCP
//! connection. One side hosts (listens on a port), the other connects as a
//! client; either side can be the sender or the receiver.
//!
//! ## Modules
//!
//! - [`config`] - Configuration management
//! - [`connection`] - Host listener and client connect
//! - [`crypto`] - Whole-buffer payload cipher
//! - [`error`] - Error type shared by every module
//! - [`history`] - Transfer log persistence
//! - [`protocol`] - Handshake line framing
//! - [`transfer`] - Session engine, byte pump and active-transfer registry
//!
//! ## Example
//!
//! ```rust,ignore
//! use swiftshare_core::connection::Endpoint;
//! use swiftshare_core::transfer::{Role, TransferSession};
//!
//! let session = TransferSession::new(Role::Sender, "notes.txt".into(), Endpoint::host(54000))?;
//! let handle = session.spawn(log_sink);
//! let outcome = handle.wait().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod history;
pub mod protocol;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default transfer port
pub const DEFAULT_PORT: u16 = 54000;

/// Lowest port a caller may choose
pub const MIN_PORT: u16 = 1025;

/// Chunk size used by the byte pump (8 KiB)
pub const CHUNK_SIZE: usize = 8 * 1024;
