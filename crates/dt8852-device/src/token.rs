//! Typed tokens and the stateful decoder that produces them.

use std::collections::HashMap;
use std::fmt;

use bytes::{Buf, Bytes};
use dt8852_frame::{kind_name, Frame, END_OF_RECORDINGS, MEASUREMENT, MODE_ACK, RECORDING_RECORD};
use tracing::warn;

use crate::mode::{ModeSetting, RecordingState};

const MODE_ACK_LEN: usize = 2;
const MEASUREMENT_LEN: usize = 3;
const RECORD_LEN: usize = 8;
const RECORD_WITH_TIMESTAMP_LEN: usize = 12;

/// Sound pressure level in tenths of a decibel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundLevel(i16);

impl SoundLevel {
    pub fn from_tenths(tenths: i16) -> Self {
        Self(tenths)
    }

    pub fn tenths(self) -> i16 {
        self.0
    }

    pub fn db(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for SoundLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.db())
    }
}

/// Measurement channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(pub u8);

impl Channel {
    /// Current sound pressure level.
    pub const SPL: Channel = Channel(0x01);
    /// Max-hold reading.
    pub const SPL_MAX: Channel = Channel(0x02);
    /// Min-hold reading.
    pub const SPL_MIN: Channel = Channel(0x03);

    pub fn name(self) -> &'static str {
        match self {
            Channel::SPL => "current_spl",
            Channel::SPL_MAX => "max_spl",
            Channel::SPL_MIN => "min_spl",
            _ => "unknown",
        }
    }
}

/// A live reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub channel: Channel,
    pub value: SoundLevel,
    /// True iff the value differs from the last one seen on this channel.
    pub changed: bool,
}

/// One stored sample from a downloaded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingRecord {
    pub session_id: u16,
    pub sample_index: u32,
    pub value: SoundLevel,
    /// Device clock in seconds, when the firmware reports one.
    pub timestamp: Option<u32>,
}

/// A decoded unit of meaning derived from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The device confirms a setting took effect.
    ModeAck(ModeSetting),
    Measurement(Measurement),
    RecordingRecord(RecordingRecord),
    /// Terminal marker of a recordings dump.
    EndOfRecordings,
    /// A verified frame this driver does not understand. Not an error.
    Unknown { kind: u8, payload: Bytes },
}

impl Token {
    pub fn name(&self) -> &'static str {
        match self {
            Token::ModeAck(_) => "mode_ack",
            Token::Measurement(m) => m.channel.name(),
            Token::RecordingRecord(_) => "recording_record",
            Token::EndOfRecordings => "end_of_recordings",
            Token::Unknown { .. } => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Token::Unknown { .. })
    }

    /// The recording state confirmed by this token, if it is such an ack.
    pub fn acked_recording_state(&self) -> Option<RecordingState> {
        match self {
            Token::ModeAck(ModeSetting::Recording(state)) => Some(*state),
            _ => None,
        }
    }
}

/// Decoder behavior.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Report `changed = false` for repeated values. When disabled every
    /// measurement is reported as changed. Default: enabled.
    pub change_suppression: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            change_suppression: true,
        }
    }
}

/// Turns verified frames into tokens, remembering the last value per channel.
#[derive(Debug, Default)]
pub struct TokenDecoder {
    config: DecoderConfig,
    previous: HashMap<Channel, SoundLevel>,
}

impl TokenDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            previous: HashMap::new(),
        }
    }

    /// Decode one frame. Never fails: anything unrecognized becomes
    /// [`Token::Unknown`].
    pub fn decode(&mut self, frame: &Frame) -> Token {
        let decoded = match frame.kind {
            MODE_ACK => decode_mode_ack(&frame.payload),
            MEASUREMENT => self.decode_measurement(&frame.payload),
            RECORDING_RECORD => decode_record(&frame.payload),
            END_OF_RECORDINGS => Some(Token::EndOfRecordings),
            _ => {
                return Token::Unknown {
                    kind: frame.kind,
                    payload: frame.payload.clone(),
                }
            }
        };

        decoded.unwrap_or_else(|| {
            warn!(
                kind = kind_name(frame.kind),
                len = frame.payload.len(),
                "malformed payload, surfacing as unknown token"
            );
            Token::Unknown {
                kind: frame.kind,
                payload: frame.payload.clone(),
            }
        })
    }

    fn decode_measurement(&mut self, payload: &Bytes) -> Option<Token> {
        if payload.len() < MEASUREMENT_LEN {
            return None;
        }
        let mut buf = payload.clone();
        let channel = Channel(buf.get_u8());
        let value = SoundLevel(buf.get_i16());

        let changed = match self.previous.insert(channel, value) {
            Some(previous) => !self.config.change_suppression || previous != value,
            None => true,
        };
        Some(Token::Measurement(Measurement {
            channel,
            value,
            changed,
        }))
    }

    /// Last value seen on a channel.
    pub fn last_value(&self, channel: Channel) -> Option<SoundLevel> {
        self.previous.get(&channel).copied()
    }

    /// Forget every channel's last value (used on reconnect).
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

fn decode_mode_ack(payload: &Bytes) -> Option<Token> {
    if payload.len() < MODE_ACK_LEN {
        return None;
    }
    ModeSetting::from_wire(payload[0], payload[1]).map(Token::ModeAck)
}

fn decode_record(payload: &Bytes) -> Option<Token> {
    if payload.len() < RECORD_LEN {
        return None;
    }
    let mut buf = payload.clone();
    let session_id = buf.get_u16();
    let sample_index = buf.get_u32();
    let value = SoundLevel(buf.get_i16());
    let timestamp = (payload.len() >= RECORD_WITH_TIMESTAMP_LEN).then(|| buf.get_u32());

    Some(Token::RecordingRecord(RecordingRecord {
        session_id,
        sample_index,
        value,
        timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use dt8852_frame::CMD_TIME_WEIGHTING;

    use super::*;
    use crate::mode::{Range, TimeWeighting};

    fn measurement(channel: u8, tenths: i16) -> Frame {
        let [hi, lo] = tenths.to_be_bytes();
        Frame::new(MEASUREMENT, vec![channel, hi, lo])
    }

    fn changed(token: Token) -> bool {
        match token {
            Token::Measurement(m) => m.changed,
            other => panic!("expected measurement, got {other:?}"),
        }
    }

    #[test]
    fn first_value_on_channel_is_changed() {
        let mut decoder = TokenDecoder::default();
        assert!(changed(decoder.decode(&measurement(1, 654))));
        assert!(changed(decoder.decode(&measurement(2, 654))));
    }

    #[test]
    fn repeated_value_is_unchanged_and_new_value_changed() {
        let mut decoder = TokenDecoder::default();
        assert!(changed(decoder.decode(&measurement(1, 654))));
        assert!(!changed(decoder.decode(&measurement(1, 654))));
        assert!(changed(decoder.decode(&measurement(1, 655))));
        assert!(changed(decoder.decode(&measurement(1, 654))));
        assert!(!changed(decoder.decode(&measurement(1, 654))));
    }

    #[test]
    fn channels_are_tracked_independently() {
        let mut decoder = TokenDecoder::default();
        decoder.decode(&measurement(1, 500));
        decoder.decode(&measurement(2, 700));
        assert!(!changed(decoder.decode(&measurement(1, 500))));
        assert!(!changed(decoder.decode(&measurement(2, 700))));
        assert_eq!(decoder.last_value(Channel(2)), Some(SoundLevel::from_tenths(700)));
    }

    #[test]
    fn disabled_suppression_reports_every_value_changed() {
        let mut decoder = TokenDecoder::new(DecoderConfig {
            change_suppression: false,
        });
        assert!(changed(decoder.decode(&measurement(1, 654))));
        assert!(changed(decoder.decode(&measurement(1, 654))));
    }

    #[test]
    fn reset_forgets_previous_values() {
        let mut decoder = TokenDecoder::default();
        decoder.decode(&measurement(1, 654));
        decoder.reset();
        assert!(changed(decoder.decode(&measurement(1, 654))));
    }

    #[test]
    fn measurement_value_is_fixed_point() {
        let mut decoder = TokenDecoder::default();
        let token = decoder.decode(&measurement(Channel::SPL.0, 654));
        let Token::Measurement(m) = token else {
            panic!("expected measurement");
        };
        assert_eq!(m.channel, Channel::SPL);
        assert_eq!(m.value.tenths(), 654);
        assert_eq!(m.value.to_string(), "65.4");
        assert_eq!(token.name(), "current_spl");
    }

    #[test]
    fn mode_ack_maps_category_and_value() {
        let mut decoder = TokenDecoder::default();
        let token = decoder.decode(&Frame::new(MODE_ACK, vec![CMD_TIME_WEIGHTING, 1]));
        assert_eq!(token, Token::ModeAck(ModeSetting::TimeWeighting(TimeWeighting::Slow)));

        let token = decoder.decode(&Frame::new(MODE_ACK, vec![0x41, 1]));
        assert_eq!(token, Token::ModeAck(ModeSetting::Range(Range::R30To80)));
    }

    #[test]
    fn recording_ack_exposes_state() {
        let mut decoder = TokenDecoder::default();
        let token = decoder.decode(&Frame::new(MODE_ACK, vec![0x44, 1]));
        assert_eq!(token.acked_recording_state(), Some(RecordingState::Recording));
    }

    #[test]
    fn records_are_never_suppressed() {
        let mut decoder = TokenDecoder::default();
        let payload = vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x07, 0x02, 0x8E];
        let first = decoder.decode(&Frame::new(RECORDING_RECORD, payload.clone()));
        let second = decoder.decode(&Frame::new(RECORDING_RECORD, payload));

        let expected = Token::RecordingRecord(RecordingRecord {
            session_id: 2,
            sample_index: 7,
            value: SoundLevel::from_tenths(654),
            timestamp: None,
        });
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[test]
    fn record_with_timestamp() {
        let mut decoder = TokenDecoder::default();
        let payload = vec![
            0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0xF4, 0x00, 0x00, 0x0E, 0x10,
        ];
        let token = decoder.decode(&Frame::new(RECORDING_RECORD, payload));
        let Token::RecordingRecord(record) = token else {
            panic!("expected record");
        };
        assert_eq!(record.sample_index, 256);
        assert_eq!(record.value.tenths(), 500);
        assert_eq!(record.timestamp, Some(3600));
    }

    #[test]
    fn end_marker() {
        let mut decoder = TokenDecoder::default();
        assert_eq!(
            decoder.decode(&Frame::empty(END_OF_RECORDINGS)),
            Token::EndOfRecordings
        );
    }

    #[test]
    fn unknown_kind_is_surfaced_not_fatal() {
        let mut decoder = TokenDecoder::default();
        let token = decoder.decode(&Frame::new(0xFF, vec![1, 2]));
        assert!(token.is_unknown());
        assert_eq!(
            token,
            Token::Unknown {
                kind: 0xFF,
                payload: Bytes::from_static(&[1, 2])
            }
        );
    }

    #[test]
    fn malformed_known_kinds_become_unknown() {
        let mut decoder = TokenDecoder::default();
        assert!(decoder.decode(&Frame::new(MEASUREMENT, vec![1, 2])).is_unknown());
        assert!(decoder.decode(&Frame::new(MODE_ACK, vec![0x41, 9])).is_unknown());
        assert!(decoder.decode(&Frame::new(RECORDING_RECORD, vec![0; 5])).is_unknown());
        assert_eq!(decoder.last_value(Channel(1)), None);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut decoder = TokenDecoder::default();
        let token = decoder.decode(&Frame::new(MEASUREMENT, vec![1, 0x01, 0xF4, 0xEE]));
        assert!(matches!(token, Token::Measurement(m) if m.value.tenths() == 500));
    }
}
