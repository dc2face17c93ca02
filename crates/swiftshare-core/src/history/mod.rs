//! Transfer log for SwiftShare.
//!
//! Every session records exactly one [`TransferLogEntry`] when it reaches a
//! terminal state. Entries go to a [`TransferLogSink`]; the default sink is a
//! JSON file in the platform data directory.
//!
//! ## Features
//!
//! - One entry per attempted transfer (success, failure or cancellation)
//! - Respects `max_entries` limit from configuration
//! - Auto-clears old entries based on `auto_clear_days`
//! - Entries are never modified after insertion

use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::config::HistoryConfig;
use crate::error::{Error, Result};

/// Final status of a logged transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TransferStatus {
    /// File arrived intact
    Success,
    /// Transfer failed with a reason
    Failed(String),
    /// Transfer was cancelled by the user
    Cancelled,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Failed(reason) => write!(f, "Failed: {reason}"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One persisted transfer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLogEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Name of the transferred file
    pub file_name: String,
    /// Label of the sending side
    pub sender: String,
    /// Label of the receiving side
    pub receiver: String,
    /// Plaintext size in bytes
    pub size_bytes: u64,
    /// When the session ended
    pub timestamp: DateTime<Utc>,
    /// Final status
    pub status: TransferStatus,
}

impl TransferLogEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        size_bytes: u64,
        status: TransferStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            size_bytes,
            timestamp: Utc::now(),
            status,
        }
    }

    /// Get the timestamp as a human-readable local string.
    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Destination for transfer records.
///
/// Sessions call [`record`](Self::record) once, on a blocking thread. An
/// error is logged and otherwise ignored; it never changes the outcome of the
/// transfer that produced the entry.
pub trait TransferLogSink: Send + Sync {
    /// Persist one entry.
    fn record(&self, entry: TransferLogEntry) -> Result<()>;
}

/// Serializable wrapper for the history file.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryDatabase {
    /// Format version
    version: u32,
    /// Entries, newest first
    entries: Vec<TransferLogEntry>,
}

impl Default for HistoryDatabase {
    fn default() -> Self {
        Self {
            version: 1,
            entries: Vec::new(),
        }
    }
}

/// JSON-file transfer history.
#[derive(Debug)]
pub struct HistoryStore {
    /// Path to the history file
    path: PathBuf,
    /// Entries (newest first)
    entries: Vec<TransferLogEntry>,
    /// Configuration settings
    config: HistoryConfig,
}

impl HistoryStore {
    /// Load the store from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(config: HistoryConfig) -> Result<Self> {
        let path = Self::default_path().unwrap_or_else(|| PathBuf::from("history.json"));
        Self::load_from(path, config)
    }

    /// Load from a specific path. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(path: PathBuf, config: HistoryConfig) -> Result<Self> {
        let entries = read_entries(&path)?;
        let mut store = Self {
            path,
            entries,
            config,
        };
        store.apply_auto_clear();

        Ok(store)
    }

    /// Default history file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "swiftshare", "SwiftShare")
            .map(|dirs| dirs.data_dir().join("history.json"))
    }

    /// Write the store to disk.
    ///
    /// The file is replaced atomically, so a concurrent reader sees either the
    /// old or the new contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its directory cannot be written.
    pub fn save(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to create history directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        let db = HistoryDatabase {
            version: 1,
            entries: self.entries.clone(),
        };

        let write_err = |e| write_error(&self.path, e);

        let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &db)
                .map_err(|e| write_error(&self.path, e))?;
            writer.flush().map_err(write_err)?;
        }
        temp.persist(&self.path)
            .map_err(|e| write_error(&self.path, e.error))?;
        Ok(())
    }

    /// Insert an entry at the front and persist.
    ///
    /// Entries written to the file by other processes since this store was
    /// loaded are picked up first and kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be re-read or saved.
    pub fn add(&mut self, entry: TransferLogEntry) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.entries = read_entries(&self.path)?;
        self.apply_auto_clear();
        self.entries.retain(|e| e.id != entry.id);
        self.entries.insert(0, entry);
        self.entries.truncate(self.config.max_entries);
        self.save()
    }

    /// Newest entries first, at most `limit` of them.
    #[must_use]
    pub fn list(&self, limit: Option<usize>) -> &[TransferLogEntry] {
        limit.map_or_else(
            || &self.entries[..],
            |n| &self.entries[..n.min(self.entries.len())],
        )
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be saved.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    /// Path of the history file.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn apply_auto_clear(&mut self) {
        if let Some(days) = self.config.auto_clear_days {
            let cutoff = Utc::now() - Duration::days(i64::from(days));

            let len_before = self.entries.len();
            self.entries.retain(|e| e.timestamp >= cutoff);

            if self.entries.len() < len_before {
                tracing::debug!(
                    removed = len_before - self.entries.len(),
                    "Auto-cleared old history entries"
                );
            }
        }
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::ConfigError(format!(
        "Failed to write history at {}: {}",
        path.display(),
        e
    ))
}

/// Entries stored at `path`, newest first. A missing file has none.
fn read_entries(path: &Path) -> Result<Vec<TransferLogEntry>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::ConfigError(format!(
                "Failed to open history at {}: {}",
                path.display(),
                e
            )))
        }
    };

    let db: HistoryDatabase = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to parse history at {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(db.entries)
}

/// [`HistoryStore`] shareable between concurrent sessions.
#[derive(Debug)]
pub struct SharedHistory(Mutex<HistoryStore>);

impl SharedHistory {
    /// Wrap a loaded store.
    #[must_use]
    pub fn new(store: HistoryStore) -> Self {
        Self(Mutex::new(store))
    }
}

impl TransferLogSink for SharedHistory {
    fn record(&self, entry: TransferLogEntry) -> Result<()> {
        let mut store = self
            .0
            .lock()
            .map_err(|_| Error::ConfigError("history lock poisoned".to_string()))?;
        tracing::debug!(file = %entry.file_name, status = %entry.status, "Logged transfer");
        store.add(entry)
    }
}

/// In-memory sink, handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<TransferLogEntry>>,
}

impl MemoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<TransferLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl TransferLogSink for MemoryLog {
    fn record(&self, entry: TransferLogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::ConfigError("log lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}
