use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default baud rate of the DT8852 USB-serial bridge.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Conventional device path for the meter's USB-serial adapter.
#[cfg(unix)]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(any(unix, windows)))]
pub const DEFAULT_PORT: &str = "";

/// Serial line settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed. Default: 9600.
    pub baud_rate: u32,
    /// Blocking read/write timeout enforced by the OS driver.
    ///
    /// This is the only place a read can be bounded; the frame reader above
    /// blocks for as long as the link does.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(2),
        }
    }
}

/// An open serial connection to a meter. Implements `Read + Write`.
///
/// The port is closed when the last handle is dropped, so every exit path
/// (including errors and panics) releases it.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: PathBuf,
}

impl SerialLink {
    /// Open `path` as 8N1 without flow control.
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        info!(?path, baud = config.baud_rate, "opened serial port");
        Ok(Self { port, path })
    }

    /// Clone the handle (shares the same OS port).
    ///
    /// Used to split one link into independent reader and writer halves.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone()?;
        debug!(path = ?self.path, "cloned serial handle");
        Ok(Self {
            port,
            path: self.path.clone(),
        })
    }

    /// Change the blocking timeout on the underlying port.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }

    /// Current blocking timeout.
    pub fn timeout(&self) -> Duration {
        self.port.timeout()
    }

    /// The path this link was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .finish()
    }
}
