//! SwiftShare handshake framing.
//!
//! Before any payload byte, the sender writes a single text line announcing
//! the file name and the number of payload bytes that follow.
//!
//! ## Line Format
//!
//! ```text
//! ┌──────────────────┬──────┬────────────────────┬──────┐
//! │    file name     │ 0x1C │ decimal byte count │ 0x0A │
//! │ (UTF-8, no '/')  │  FS  │   (ciphertext)     │  LF  │
//! └──────────────────┴──────┴────────────────────┴──────┘
//! ```
//!
//! The ASCII "file separator" control byte is used as delimiter because file
//! names may contain any printable character. The payload is exactly the
//! announced number of bytes, written directly after the newline.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Field separator between file name and size (ASCII 0x1C).
pub const SEPARATOR: char = '\u{1c}';

/// Longest handshake line accepted, terminator included.
pub const MAX_HANDSHAKE_LEN: usize = 4096;

/// Metadata exchanged before the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Bare file name, no directory components
    pub file_name: String,
    /// Payload bytes that follow the line
    pub size: u64,
}

impl Handshake {
    /// Create a handshake.
    #[must_use]
    pub fn new(file_name: impl Into<String>, size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size,
        }
    }
}

/// Encode a handshake line without its terminator.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the name contains the separator byte or
/// a line terminator, or is not a name the receiving side accepts.
pub fn encode_handshake(file_name: &str, size: u64) -> Result<String> {
    if file_name.contains(SEPARATOR) || file_name.contains(['\n', '\r']) {
        return Err(Error::InvalidInput(format!(
            "file name {file_name:?} contains a reserved control character"
        )));
    }
    if let Some(problem) = file_name_problem(file_name) {
        return Err(Error::InvalidInput(problem));
    }
    Ok(format!("{file_name}{SEPARATOR}{size}"))
}

/// Decode a handshake line. A trailing `\n` or `\r\n` is ignored.
///
/// # Errors
///
/// Returns [`Error::MalformedHandshake`] unless the line splits into exactly
/// two fields, the second is a decimal `u64`, and the first is a usable bare
/// file name.
pub fn decode_handshake(line: &str) -> Result<Handshake> {
    let line = line
        .strip_suffix('\n')
        .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));

    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    let [file_name, size] = fields.as_slice() else {
        return Err(Error::MalformedHandshake(format!(
            "expected 2 fields, found {}",
            fields.len()
        )));
    };

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedHandshake(format!(
            "size field {size:?} is not a non-negative integer"
        )));
    }
    let size = size
        .parse::<u64>()
        .map_err(|e| Error::MalformedHandshake(format!("size field out of range: {e}")))?;

    if let Some(problem) = file_name_problem(file_name) {
        return Err(Error::MalformedHandshake(problem));
    }

    Ok(Handshake::new(*file_name, size))
}

/// Why `name` cannot be used as a bare file name on the receiving side.
fn file_name_problem(name: &str) -> Option<String> {
    if name.is_empty() || name == "." || name == ".." {
        Some(format!("unusable file name {name:?}"))
    } else if name.contains(['/', '\\', '\0']) {
        Some(format!("file name {name:?} contains a path separator"))
    } else {
        None
    }
}

/// Write a handshake line and flush it.
///
/// # Errors
///
/// Returns an error if the name cannot be encoded or the write fails.
pub async fn write_handshake<W>(writer: &mut W, handshake: &Handshake) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode_handshake(&handshake.file_name, handshake.size)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one handshake line.
///
/// The reader must be buffered; bytes after the newline stay in its buffer
/// and belong to the payload.
///
/// # Errors
///
/// Returns [`Error::MalformedHandshake`] if the peer closes before the
/// newline, or for an oversized, non-UTF-8 or badly shaped line.
pub async fn read_handshake<R>(reader: &mut R) -> Result<Handshake>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    let n = reader
        .take(MAX_HANDSHAKE_LEN as u64)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Err(Error::MalformedHandshake(
            "connection closed before handshake".to_string(),
        ));
    }
    if buf.last() != Some(&b'\n') {
        return Err(Error::MalformedHandshake(if n >= MAX_HANDSHAKE_LEN {
            format!("line exceeds {MAX_HANDSHAKE_LEN} bytes")
        } else {
            "connection closed mid-line".to_string()
        }));
    }

    let line = String::from_utf8(buf)
        .map_err(|_| Error::MalformedHandshake("line is not valid UTF-8".to_string()))?;
    decode_handshake(&line)
}
