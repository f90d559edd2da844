//! Host-to-device command frames.

use dt8852_frame::{Frame, DUMP_REQUEST};

use crate::mode::ModeSetting;

/// Encode one setting as the command frame for its category.
///
/// Every setting is its own frame; the device acknowledges each one
/// independently with a mode-ack carrying the same category and value.
pub fn encode(setting: &ModeSetting) -> Frame {
    Frame::new(setting.category().command_kind(), vec![setting.code()])
}

/// Frame asking the device to stream every stored recording session.
pub fn dump_request() -> Frame {
    Frame::empty(DUMP_REQUEST)
}
