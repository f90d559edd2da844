/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer head is not a start marker.
    #[error("invalid start marker 0x{0:02X} (expected 0xA5)")]
    InvalidStart(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The trailing checksum does not cover the received bytes.
    #[error("checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Resynchronization gave up: too much garbage since the last good frame.
    #[error("link exhausted after {attempts} resync attempts ({discarded} bytes discarded)")]
    LinkExhausted { attempts: usize, discarded: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the reader absorbs this error by resynchronizing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidStart(_)
                | FrameError::PayloadTooLarge { .. }
                | FrameError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
