//! Configuration management for SwiftShare.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/swiftshare/config.toml` |
//! | macOS | `~/Library/Application Support/com.swiftshare.SwiftShare/config.toml` |
//! | Windows | `%APPDATA%\swiftshare\SwiftShare\config\config.toml` |
//!
//! ## Example
//!
//! ```toml
//! [network]
//! port = 54000
//! connect_timeout = "10s"
//! keepalive = true
//!
//! [transfer]
//! default_output = "/home/me/Downloads"
//!
//! [history]
//! enabled = true
//! max_entries = 100
//! auto_clear_days = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::{ConnectOptions, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{Error, Result};

/// Main configuration struct for SwiftShare.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub network: NetworkConfig,
    /// Transfer settings
    pub transfer: TransferConfig,
    /// History settings
    pub history: HistoryConfig,
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Port used when none is given on the command line
    pub port: u16,
    /// Outbound connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Enable TCP keep-alive on session sockets
    pub keepalive: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: true,
        }
    }
}

impl NetworkConfig {
    /// Socket options for a session.
    #[must_use]
    pub const fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            keepalive: self.keepalive,
        }
    }
}

/// Transfer configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Directory received files go to when none is given
    pub default_output: Option<PathBuf>,
}

/// History configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record transfers at all
    pub enabled: bool,
    /// Keep at most this many entries
    pub max_entries: usize,
    /// Drop entries older than this many days on load
    pub auto_clear_days: Option<u32>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            auto_clear_days: Some(30),
        }
    }
}

impl Config {
    /// Load the configuration from the default path, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        toml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save to an explicit path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Platform configuration directory.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "swiftshare", "SwiftShare")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Full path of `config.toml`.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

/// Durations as `"500ms"`, `"10s"` or `"2m"`.
mod humantime_serde {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let text = text.trim();
        let (digits, scale) = if let Some(ms) = text.strip_suffix("ms") {
            (ms, 1)
        } else if let Some(secs) = text.strip_suffix('s') {
            (secs, 1000)
        } else if let Some(mins) = text.strip_suffix('m') {
            (mins, 60_000)
        } else {
            return Err(D::Error::custom(format!("invalid duration {text:?}")));
        };
        let value: u64 = digits.trim().parse().map_err(D::Error::custom)?;
        value
            .checked_mul(scale)
            .map(Duration::from_millis)
            .ok_or_else(|| D::Error::custom("duration too large"))
    }
}
