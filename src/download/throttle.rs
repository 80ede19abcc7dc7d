//! Byte-rate throttling for media transfers.
//!
//! The limiter keeps cumulative throughput at or below the configured ceiling:
//! after every chunk it sleeps until wall-clock time catches up with the time
//! the bytes written so far *should* have taken. Within any window the
//! overshoot is at most one chunk.
//!
//! # Example
//!
//! ```
//! use v2dl_core::download::{ByteRateLimit, throttled_copy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let body = futures_util::stream::iter(vec![Ok::<_, std::io::Error>(vec![0u8; 4096])]);
//! let mut sink = Vec::new();
//! let written = throttled_copy(body, &mut sink, ByteRateLimit::disabled()).await?;
//! assert_eq!(written, 4096);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

use super::constants::CHUNK_SIZE;

/// Throughput ceiling in bytes per second; zero disables throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRateLimit {
    bytes_per_sec: u64,
}

impl ByteRateLimit {
    /// Creates a limit from KiB/s, the unit exposed in configuration.
    #[must_use]
    pub fn from_kib_per_sec(kib: u64) -> Self {
        Self {
            bytes_per_sec: kib.saturating_mul(1024),
        }
    }

    /// Creates a limit from bytes per second.
    #[must_use]
    pub fn from_bytes_per_sec(bytes_per_sec: u64) -> Self {
        Self { bytes_per_sec }
    }

    /// A limit that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self { bytes_per_sec: 0 }
    }

    /// Returns whether throttling is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.bytes_per_sec == 0
    }

    /// Configured ceiling in bytes per second.
    #[must_use]
    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Minimum time `bytes` may take under this limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn expected_duration(&self, bytes: u64) -> Duration {
        if self.is_disabled() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / self.bytes_per_sec as f64)
    }
}

/// Failure of a throttled copy: either the source stream or the sink.
#[derive(Debug, Error)]
pub enum CopyError<E> {
    /// The body stream yielded an error.
    #[error("source stream failed: {0}")]
    Source(E),
    /// Writing to the sink failed.
    #[error("write failed: {0}")]
    Sink(#[source] std::io::Error),
}

/// Copies `stream` into `writer` in chunks of at most [`CHUNK_SIZE`] bytes,
/// sleeping between chunks to respect `limit`. Returns bytes written.
///
/// # Errors
///
/// Returns [`CopyError::Source`] for stream errors and [`CopyError::Sink`]
/// for write or flush errors. Bytes already written stay in the sink.
#[instrument(skip(stream, writer), fields(bytes_per_sec = limit.bytes_per_sec()))]
pub async fn throttled_copy<S, B, E, W>(
    stream: S,
    writer: &mut W,
    limit: ByteRateLimit,
) -> Result<u64, CopyError<E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let start = Instant::now();
    let mut written: u64 = 0;
    let mut slept = Duration::ZERO;

    while let Some(item) = stream.next().await {
        let buf = item.map_err(CopyError::Source)?;
        for chunk in buf.as_ref().chunks(CHUNK_SIZE) {
            writer.write_all(chunk).await.map_err(CopyError::Sink)?;
            written += chunk.len() as u64;
            slept += pace(start, written, limit).await;
        }
    }

    writer.flush().await.map_err(CopyError::Sink)?;
    debug!(
        bytes = written,
        elapsed_ms = start.elapsed().as_millis(),
        throttled_ms = slept.as_millis(),
        "copy finished"
    );
    Ok(written)
}

/// Sleeps `expected(written) - elapsed`, clamped at zero. Returns the sleep.
async fn pace(start: Instant, written: u64, limit: ByteRateLimit) -> Duration {
    if limit.is_disabled() {
        return Duration::ZERO;
    }
    let expected = limit.expected_duration(written);
    let elapsed = start.elapsed();
    match expected.checked_sub(elapsed) {
        Some(wait) if !wait.is_zero() => {
            trace!(written, wait_us = wait.as_micros(), "throttling");
            tokio::time::sleep(wait).await;
            wait
        }
        _ => Duration::ZERO,
    }
}
