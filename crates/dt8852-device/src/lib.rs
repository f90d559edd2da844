//! Device session for DT8852 sound-level meters.
//!
//! This is the layer callers use. Push mode settings, then pull typed tokens
//! in a loop and decide for yourself when to stop:
//!
//! ```no_run
//! use dt8852_device::{Device, DeviceConfig, ModeRequestSet, Range, Token};
//! use dt8852_transport::SerialConfig;
//!
//! # fn main() -> dt8852_device::Result<()> {
//! let mut device = Device::open("/dev/ttyUSB0", &SerialConfig::default(), DeviceConfig::default())?;
//! let mut pending: ModeRequestSet = [Range::R30To80].into_iter().collect();
//! device.set_mode(pending.as_slice())?;
//! while !pending.is_empty() {
//!     if let Token::ModeAck(setting) = device.next_token()? {
//!         pending.acknowledge(&setting);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Recording hazard
//!
//! Toggling [`RecordingState`] through [`Device::set_mode`] while the meter
//! is mid-session can corrupt the sessions stored on the device, after which
//! a full dump is impossible until its storage is cleared. The driver warns
//! when it knows a session is running but never refuses the request; the
//! device, not the driver, owns the recording state.

pub mod command;
pub mod device;
pub mod error;
pub mod mode;
pub mod recordings;
pub mod token;

pub use device::{Changes, Device, DeviceConfig, SerialDevice, Tokens};
pub use error::{Result, SessionError};
pub use mode::{
    FrequencyWeighting, ModeCategory, ModeRequestSet, ModeSetting, ParseModeError, Range,
    RecordingState, TimeWeighting,
};
pub use recordings::Recordings;
pub use token::{
    Channel, DecoderConfig, Measurement, RecordingRecord, SoundLevel, Token, TokenDecoder,
};
