//! Driver for DT8852-class sound level meters over a serial link.
//!
//! The meter streams framed binary tokens: live measurements, mode
//! acknowledgments and, on request, the contents of its recording memory.
//! This crate re-exports the layers that turn those bytes into typed values.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port access
//! - [`frame`]: start-marker framing, checksums and stream resynchronization
//! - [`device`]: mode commands, token decoding and the device session
//!
//! # Example
//!
//! ```no_run
//! use dt8852::device::{Device, DeviceConfig, Token};
//! use dt8852::transport::SerialConfig;
//!
//! let mut meter = Device::open("/dev/ttyUSB0", &SerialConfig::default(), DeviceConfig::default())?;
//! for token in meter.changes().take(10) {
//!     if let Token::Measurement(m) = token? {
//!         println!("{} dB", m.value);
//!     }
//! }
//! # Ok::<(), dt8852::device::SessionError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use dt8852_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dt8852_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use dt8852_device::*;
}
