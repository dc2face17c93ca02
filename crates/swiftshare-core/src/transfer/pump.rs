//! Chunked byte pump with pause support.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::error::Result;
use crate::CHUNK_SIZE;

/// Position of a running pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpProgress {
    /// Bytes written to the sink so far
    pub transferred: u64,
    /// Bytes the pump was asked to move
    pub total: u64,
}

impl PumpProgress {
    /// Fraction of the total moved, in `[0, 1]`. An empty total counts as done.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.transferred as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Copy up to `expected_total` bytes from `source` to `sink` in
/// [`CHUNK_SIZE`] chunks.
///
/// Each chunk is read in full (unless the source ends), written, flushed,
/// and reported through `on_progress`. The `paused` flag is consulted at
/// every chunk boundary: while it reads `true` nothing is read or written.
///
/// A source that ends early is not an error; the returned count tells the
/// caller how many bytes actually moved. The sink is shut down and both
/// handles dropped on every exit path.
///
/// # Errors
///
/// Returns an error if a read, write or flush fails.
pub async fn pump<R, W, F>(
    mut source: R,
    mut sink: W,
    expected_total: u64,
    paused: &mut watch::Receiver<bool>,
    mut on_progress: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(PumpProgress),
{
    let result = copy_chunks(
        &mut source,
        &mut sink,
        expected_total,
        paused,
        &mut on_progress,
    )
    .await;

    if let Err(e) = sink.shutdown().await {
        tracing::debug!("Sink shutdown: {e}");
    }

    result
}

async fn copy_chunks<R, W, F>(
    source: &mut R,
    sink: &mut W,
    expected_total: u64,
    paused: &mut watch::Receiver<bool>,
    on_progress: &mut F,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(PumpProgress),
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;

    while transferred < expected_total {
        let is_paused = *paused.borrow();
        if is_paused {
            tracing::debug!(transferred, "Pump paused");
            // A dropped controller can never resume us; carry on instead.
            let _ = paused.wait_for(|p| !*p).await;
            tracing::debug!(transferred, "Pump resumed");
        }

        let want = usize::try_from(expected_total - transferred)
            .map_or(CHUNK_SIZE, |remaining| remaining.min(CHUNK_SIZE));
        let n = read_chunk(source, &mut buf[..want]).await?;
        if n == 0 {
            break;
        }

        sink.write_all(&buf[..n]).await?;
        sink.flush().await?;
        transferred += n as u64;

        on_progress(PumpProgress {
            transferred,
            total: expected_total,
        });

        if n < want {
            break;
        }
    }

    if transferred < expected_total {
        tracing::debug!(transferred, expected_total, "Source ended early");
    }

    Ok(transferred)
}

/// Fill `buf` unless the source hits EOF first.
async fn read_chunk<R>(source: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
