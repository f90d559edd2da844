use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::codec::{decode_frame, Frame, FrameConfig, START};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 256;

/// Reads complete, checksum-verified frames from any `Read` stream.
///
/// Handles partial reads internally and resynchronizes after corruption:
/// garbage before a start marker is skipped, and a candidate frame with a bad
/// length or checksum costs one byte before scanning resumes. Only when the
/// garbage since the last good frame exceeds the configured budget does
/// [`read_frame`](Self::read_frame) fail with [`FrameError::LinkExhausted`].
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    attempts: usize,
    discarded: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            attempts: 0,
            discarded: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    /// There is no internal timeout; a silent link blocks for as long as the
    /// underlying stream does.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match decode_frame(&mut self.buf, self.config.max_payload_size) {
                Ok(Some(frame)) => {
                    if self.discarded > 0 {
                        warn!(
                            attempts = self.attempts,
                            discarded = self.discarded,
                            "resynchronized frame stream"
                        );
                    }
                    self.attempts = 0;
                    self.discarded = 0;
                    return Ok(frame);
                }
                Ok(None) => {}
                Err(err) if err.is_transient() => {
                    self.resync(&err)?;
                    continue;
                }
                Err(err) => return Err(err),
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            trace!(bytes = read, "read from link");
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Drop buffered bytes after a rejected frame candidate.
    ///
    /// Discard counts depend only on buffer contents, never on how the
    /// stream was chunked, so resync decisions are chunking-independent.
    fn resync(&mut self, err: &FrameError) -> Result<()> {
        let dropped = match err {
            FrameError::InvalidStart(_) => self.buf[1..]
                .iter()
                .position(|b| *b == START)
                .map_or(self.buf.len(), |pos| pos + 1),
            _ => {
                self.attempts += 1;
                trace!(error = %err, "rejected frame candidate");
                1
            }
        };
        self.buf.advance(dropped);
        self.discarded += dropped;

        if self.discarded > self.config.max_resync_bytes
            || self.attempts > self.config.max_resync_attempts
        {
            let (attempts, discarded) = (self.attempts, self.discarded);
            self.attempts = 0;
            self.discarded = 0;
            return Err(FrameError::LinkExhausted {
                attempts,
                discarded,
            });
        }
        Ok(())
    }

    /// Drop everything buffered and reset the resync counters.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.attempts = 0;
        self.discarded = 0;
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
