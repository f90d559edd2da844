//! Frame kind markers.
//!
//! The values below are a self-consistent assignment, not a byte trace of
//! real firmware. They live here so a single edit retargets the driver once
//! the device layout is confirmed.

/// Device confirms a mode setting. Payload: `[category, value]`.
pub const MODE_ACK: u8 = 0x10;

/// Live reading. Payload: `[channel, i16 BE tenths of dB]`.
pub const MEASUREMENT: u8 = 0x20;

/// One stored sample. Payload: `[u16 session][u32 index][i16 tenths]([u32 timestamp])`.
pub const RECORDING_RECORD: u8 = 0x30;

/// Terminates a recordings dump. Empty payload.
pub const END_OF_RECORDINGS: u8 = 0x3F;

/// Select measurement range.
pub const CMD_RANGE: u8 = 0x41;

/// Select time weighting (fast/slow).
pub const CMD_TIME_WEIGHTING: u8 = 0x42;

/// Select frequency weighting (dB(A)/dB(C)).
pub const CMD_FREQUENCY_WEIGHTING: u8 = 0x43;

/// Start or stop on-board recording.
pub const CMD_RECORDING: u8 = 0x44;

/// Ask the device to stream every stored session.
pub const DUMP_REQUEST: u8 = 0x4D;

/// Returns a human-readable name for a frame kind.
pub fn kind_name(kind: u8) -> &'static str {
    match kind {
        MODE_ACK => "MODE_ACK",
        MEASUREMENT => "MEASUREMENT",
        RECORDING_RECORD => "RECORDING_RECORD",
        END_OF_RECORDINGS => "END_OF_RECORDINGS",
        CMD_RANGE => "CMD_RANGE",
        CMD_TIME_WEIGHTING => "CMD_TIME_WEIGHTING",
        CMD_FREQUENCY_WEIGHTING => "CMD_FREQUENCY_WEIGHTING",
        CMD_RECORDING => "CMD_RECORDING",
        DUMP_REQUEST => "DUMP_REQUEST",
        _ => "UNKNOWN",
    }
}
