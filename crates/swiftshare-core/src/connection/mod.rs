//! Connection setup for transfer sessions.
//!
//! A session either hosts (binds a port and accepts exactly one peer) or
//! connects to a remote `host:port`. Both paths end with a plain connected
//! [`TcpStream`]; the listener never outlives the single accept.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::MIN_PORT;

/// Default time allowed for an outbound connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a session gets its socket from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Listen on `port` and accept one peer
    Host {
        /// Local port to bind
        port: u16,
    },
    /// Connect to `host:port`
    Remote {
        /// IP address or resolvable name
        host: String,
        /// Remote port
        port: u16,
    },
}

impl Endpoint {
    /// Host endpoint on `port`.
    #[must_use]
    pub const fn host(port: u16) -> Self {
        Self::Host { port }
    }

    /// Remote endpoint at `host:port`.
    #[must_use]
    pub fn remote(host: impl Into<String>, port: u16) -> Self {
        Self::Remote {
            host: host.into(),
            port,
        }
    }

    /// Port this endpoint binds or dials.
    #[must_use]
    pub const fn port(&self) -> u16 {
        match self {
            Self::Host { port } | Self::Remote { port, .. } => *port,
        }
    }

    /// Whether this side listens.
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host { .. })
    }

    /// Human-readable description shown while the session is active.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            Self::Host { port } => format!("Host Connection @localhost:{port}"),
            Self::Remote { host, port } => format!("Remote Connection @{host}:{port}"),
        }
    }
}

/// Socket options applied to every session connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Upper bound on an outbound connect
    pub connect_timeout: Duration,
    /// Enable OS-level TCP keep-alive
    pub keepalive: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: true,
        }
    }
}

/// Check a user-chosen port against the allowed range (1025-65535).
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for privileged ports.
pub fn validate_port(port: u16) -> Result<u16> {
    if port < MIN_PORT {
        return Err(Error::InvalidInput(format!(
            "port {port} is outside the allowed range {MIN_PORT}-65535"
        )));
    }
    Ok(port)
}

/// A bound, single-use host listener.
#[derive(Debug)]
pub struct HostListener {
    listener: TcpListener,
    port: u16,
}

impl HostListener {
    /// Bind `0.0.0.0:<port>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| Error::Connection(format!("cannot listen on port {port}: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::Connection(format!("listener has no local address: {e}")))?
            .port();

        tracing::debug!(port, "Listening for one peer");
        Ok(Self { listener, port })
    }

    /// The bound port (differs from the requested one only when 0 was asked).
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Accept exactly one peer and close the listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if accepting fails.
    pub async fn accept_one(self) -> Result<(TcpStream, SocketAddr)> {
        let accepted = self
            .listener
            .accept()
            .await
            .map_err(|e| Error::Connection(format!("accept failed: {e}")))?;
        tracing::info!("Connection from {}", accepted.1);
        Ok(accepted)
    }
}

/// Connect to `host:port` within `timeout`.
///
/// # Errors
///
/// Returns [`Error::Connection`] if the host does not resolve, refuses the
/// connection, or does not answer in time.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let attempt = TcpStream::connect((host, port));
    let stream = tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| {
            Error::Connection(format!(
                "connecting to {host}:{port} timed out after {}s",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| Error::Connection(format!("cannot connect to {host}:{port}: {e}")))?;

    tracing::info!("Connected to {}:{}", host, port);
    Ok(stream)
}

/// Configure TCP keep-alive on a socket.
///
/// Probing starts after 10 seconds of idle time and repeats every 5 seconds,
/// so a paused transfer does not get its connection reaped by middleboxes.
pub fn configure_tcp_keepalive(stream: &TcpStream) -> Result<()> {
    let socket_ref = SockRef::from(stream);

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(10))
        .with_interval(Duration::from_secs(5));

    socket_ref
        .set_tcp_keepalive(&keepalive)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    tracing::debug!("TCP keep-alive enabled on socket");
    Ok(())
}

/// Split a `--host` argument into host and port.
///
/// Accepts formats:
/// - `HOST` (e.g., `192.168.1.100` or `laptop.local`) - uses `default_port`
/// - `HOST:PORT` (e.g., `192.168.1.100:54001`)
/// - `[IPv6]` or `[IPv6]:PORT` (e.g., `[::1]:54001`)
/// - bare IPv6 (e.g., `::1`) - uses `default_port`
///
/// # Examples
///
/// ```
/// use swiftshare_core::connection::parse_remote;
///
/// let (host, port) = parse_remote("192.168.1.100", 54000).unwrap();
/// assert_eq!((host.as_str(), port), ("192.168.1.100", 54000));
///
/// let (host, port) = parse_remote("[::1]:54001", 54000).unwrap();
/// assert_eq!((host.as_str(), port), ("::1", 54001));
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty or the port part is not a number.
pub fn parse_remote(input: &str, default_port: u16) -> Result<(String, u16)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("remote host is empty".to_string()));
    }

    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok((addr.ip().to_string(), addr.port()));
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok((ip.to_string(), default_port));
    }

    if let Some(inner) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let ip: IpAddr = inner.parse().map_err(|_| {
            Error::InvalidInput(format!("invalid IPv6 address '{input}'"))
        })?;
        return Ok((ip.to_string(), default_port));
    }

    if let Some((host, port)) = input.rsplit_once(':') {
        let port: u16 = port.parse().map_err(|_| {
            Error::InvalidInput(format!(
                "invalid port '{port}'. Port must be a number between {MIN_PORT} and 65535"
            ))
        })?;
        if host.is_empty() {
            return Err(Error::InvalidInput(format!("missing host in '{input}'")));
        }
        return Ok((host.to_string(), port));
    }

    Ok((input.to_string(), default_port))
}
