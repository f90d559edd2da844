//! Blocking serial transport for DT8852 sound-level meters.
//!
//! This is the lowest layer of the driver. It opens a named serial port and
//! hands out a [`SerialLink`] that implements `Read + Write`; everything else
//! builds on top of those two traits, so tests and alternative links can
//! substitute any in-memory stream.
//!
//! Port discovery and OS device-path policy are the caller's concern.

pub mod error;
pub mod serial;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_PORT};
