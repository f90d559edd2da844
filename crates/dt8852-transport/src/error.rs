use std::path::PathBuf;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial port at the given path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: serialport::Error,
    },

    /// The serial driver rejected an operation on an open port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Convert into an `std::io::Error`, preserving the kind where possible.
    pub fn into_io(self) -> std::io::Error {
        match self {
            TransportError::Io(err) => err,
            TransportError::Serial(err) | TransportError::Open { source: err, .. } => err.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
