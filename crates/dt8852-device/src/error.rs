use std::io::ErrorKind;

use dt8852_frame::FrameError;

/// Errors that can occur in device session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error (opening or cloning the port).
    #[error("transport error: {0}")]
    Transport(#[from] dt8852_transport::TransportError),

    /// Frame-level error that resynchronization could not absorb.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An earlier hard failure left the session unusable; reconnect or reset.
    #[error("session poisoned by an earlier link failure; reconnect required")]
    Poisoned,
}

impl SessionError {
    /// The reader gave up resynchronizing.
    pub fn is_link_exhausted(&self) -> bool {
        matches!(self, SessionError::Frame(FrameError::LinkExhausted { .. }))
    }

    /// The transport's own read/write timeout elapsed.
    ///
    /// The session stays usable; buffered partial frames are kept.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::Frame(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
