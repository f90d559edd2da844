//! Checksummed framing for the DT8852 serial protocol.
//!
//! Every unit on the wire is framed with:
//! - A 1-byte start marker (`0xA5`) for stream synchronization
//! - A 1-byte frame kind
//! - A 1-byte payload length
//! - The payload, followed by a 1-byte additive checksum
//!
//! The reader reassembles frames from arbitrarily chunked reads and
//! resynchronizes after corruption; callers always get complete, verified
//! frames or a hard error once the link is beyond recovery.

pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use codec::{
    checksum, decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    DEFAULT_MAX_RESYNC_ATTEMPTS, DEFAULT_MAX_RESYNC_BYTES, HEADER_SIZE, START, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use kind::{
    kind_name, CMD_FREQUENCY_WEIGHTING, CMD_RANGE, CMD_RECORDING, CMD_TIME_WEIGHTING, DUMP_REQUEST,
    END_OF_RECORDINGS, MEASUREMENT, MODE_ACK, RECORDING_RECORD,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
