use std::io::{Read, Write};
use std::iter::FusedIterator;
use std::path::Path;

use dt8852_frame::{FrameConfig, FrameReader, FrameWriter};
use dt8852_transport::{SerialConfig, SerialLink};
use tracing::{debug, info, warn};

use crate::command;
use crate::error::{Result, SessionError};
use crate::mode::{ModeSetting, RecordingState};
use crate::recordings::Recordings;
use crate::token::{DecoderConfig, Token, TokenDecoder};

/// Session behavior.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Reassembly and resync budget for incoming frames.
    pub frame: FrameConfig,
    /// Change-suppression policy for live measurements.
    pub decoder: DecoderConfig,
}

/// A device session over a serial port.
pub type SerialDevice = Device<SerialLink, SerialLink>;

/// A connected meter.
///
/// Owns the reader half, the writer half and the decoder state; nothing is
/// shared with other sessions. All methods take `&mut self` and block on the
/// transport, so progress happens only while the caller is inside
/// [`next_token`](Self::next_token) (or an iterator built on it).
pub struct Device<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    decoder: TokenDecoder,
    recording: Option<RecordingState>,
    poisoned: bool,
}

impl SerialDevice {
    /// Open a serial port and start a session on it.
    pub fn open(
        path: impl AsRef<Path>,
        serial: &SerialConfig,
        config: DeviceConfig,
    ) -> Result<Self> {
        let link = SerialLink::open(path, serial)?;
        let reader = link.try_clone()?;
        Ok(Self::from_parts(reader, link, config))
    }
}

impl<R: Read, W: Write> Device<R, W> {
    /// Build a session from separate reader and writer halves.
    pub fn from_parts(reader: R, writer: W, config: DeviceConfig) -> Self {
        Self {
            writer: FrameWriter::with_config(writer, &config.frame),
            reader: FrameReader::with_config(reader, config.frame),
            decoder: TokenDecoder::new(config.decoder),
            recording: None,
            poisoned: false,
        }
    }

    /// Send one command frame per setting, in order.
    ///
    /// Does not wait for acknowledgments: they arrive as
    /// [`Token::ModeAck`] through [`next_token`](Self::next_token), one per
    /// category, in whatever order the device chooses.
    ///
    /// # Hazard
    ///
    /// Changing [`ModeSetting::Recording`] while the meter is mid-session can
    /// corrupt its stored sessions so that a full download becomes impossible
    /// until the on-board storage is cleared. The driver cannot query the
    /// device's recording state; it only remembers the last acknowledged one
    /// (see [`recording_state`](Self::recording_state)) and logs a warning
    /// when that state says a session is running. The request is always sent.
    pub fn set_mode(&mut self, settings: &[ModeSetting]) -> Result<()> {
        for setting in settings {
            if let ModeSetting::Recording(requested) = setting {
                if self.recording == Some(RecordingState::Recording) {
                    warn!(
                        ?requested,
                        "changing recording state while a session is in progress; \
                         stored sessions may become unreadable until device storage is cleared"
                    );
                }
            }
            self.writer.write_frame(&command::encode(setting))?;
            debug!(%setting, "mode setting sent");
        }
        Ok(())
    }

    /// Block until the next frame arrives and decode it.
    ///
    /// Transient framing errors are absorbed by resynchronization. A failure
    /// that cannot be absorbed (link exhaustion, closed link, I/O error) is
    /// returned once and poisons the session; later calls return
    /// [`SessionError::Poisoned`] until [`reset`](Self::reset). Transport
    /// timeouts are returned without poisoning.
    pub fn next_token(&mut self) -> Result<Token> {
        if self.poisoned {
            return Err(SessionError::Poisoned);
        }

        let frame = match self.reader.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let err = SessionError::from(err);
                if !err.is_timeout() {
                    warn!(error = %err, "link failed; session poisoned");
                    self.poisoned = true;
                }
                return Err(err);
            }
        };

        let token = self.decoder.decode(&frame);
        if let Some(state) = token.acked_recording_state() {
            self.recording = Some(state);
        }
        if token.is_unknown() {
            debug!(kind = frame.kind, len = frame.payload.len(), "unknown token");
        }
        Ok(token)
    }

    /// Endless stream of tokens; ends only after yielding a hard error.
    pub fn tokens(&mut self) -> Tokens<'_, R, W> {
        Tokens {
            device: self,
            done: false,
        }
    }

    /// Like [`tokens`](Self::tokens), but skips measurements whose value did
    /// not change since the last one on the same channel.
    pub fn changes(&mut self) -> Changes<'_, R, W> {
        Changes {
            inner: self.tokens(),
        }
    }

    /// Request a dump of every stored session and stream its records.
    ///
    /// The returned sequence ends at the device's end-of-recordings marker.
    /// It is not restartable; calling this again sends a fresh request.
    pub fn get_recordings(&mut self) -> Result<Recordings<'_, R, W>> {
        if self.poisoned {
            return Err(SessionError::Poisoned);
        }
        self.writer.write_frame(&command::dump_request())?;
        info!("requested recordings dump");
        Ok(Recordings::new(self))
    }

    /// Last recording state the device acknowledged, if any.
    ///
    /// Advisory only: the device's own button changes it without telling us.
    pub fn recording_state(&self) -> Option<RecordingState> {
        self.recording
    }

    /// Whether an earlier hard failure made the session unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Clear buffered bytes, decoder state and the poisoned flag.
    ///
    /// Call after re-establishing the link underneath the session.
    pub fn reset(&mut self) {
        self.reader.clear();
        self.decoder.reset();
        self.recording = None;
        self.poisoned = false;
    }

    /// Current decoder state, for inspection.
    pub fn decoder(&self) -> &TokenDecoder {
        &self.decoder
    }

    /// Release the reader and writer halves. Dropping them closes the link.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}

/// Iterator returned by [`Device::tokens`].
pub struct Tokens<'a, R, W> {
    device: &'a mut Device<R, W>,
    done: bool,
}

impl<R: Read, W: Write> Iterator for Tokens<'_, R, W> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.device.next_token() {
            Ok(token) => Some(Ok(token)),
            Err(err) if err.is_timeout() => Some(Err(err)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read, W: Write> FusedIterator for Tokens<'_, R, W> {}

/// Iterator returned by [`Device::changes`].
pub struct Changes<'a, R, W> {
    inner: Tokens<'a, R, W>,
}

impl<R: Read, W: Write> Iterator for Changes<'_, R, W> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(Token::Measurement(m)) if !m.changed => continue,
                other => return Some(other),
            }
        }
    }
}

impl<R: Read, W: Write> FusedIterator for Changes<'_, R, W> {}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};

    use bytes::BytesMut;
    use dt8852_frame::{
        encode_frame, Frame, FrameError, CMD_RANGE, CMD_RECORDING, MEASUREMENT, MODE_ACK,
    };

    use super::*;
    use crate::mode::{Range, TimeWeighting};

    fn wire(frames: &[(u8, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (kind, payload) in frames {
            encode_frame(*kind, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn device(incoming: Vec<u8>) -> Device<Cursor<Vec<u8>>, Vec<u8>> {
        Device::from_parts(Cursor::new(incoming), Vec::new(), DeviceConfig::default())
    }

    fn written_frames(bytes: Vec<u8>) -> Vec<Frame> {
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let mut frames = Vec::new();
        while let Ok(frame) = reader.read_frame() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn set_mode_writes_one_frame_per_setting_in_order() {
        let mut dev = device(Vec::new());
        dev.set_mode(&[
            Range::R30To80.into(),
            TimeWeighting::Slow.into(),
            RecordingState::Recording.into(),
        ])
        .unwrap();

        let (_, written) = dev.into_parts();
        let frames = written_frames(written);
        let kinds: Vec<u8> = frames.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![CMD_RANGE, 0x42, CMD_RECORDING]);
    }

    #[test]
    fn next_token_tracks_recording_ack() {
        let mut dev = device(wire(&[(MODE_ACK, &[CMD_RECORDING, 1])]));
        assert_eq!(dev.recording_state(), None);

        let token = dev.next_token().unwrap();
        assert_eq!(token, Token::ModeAck(RecordingState::Recording.into()));
        assert_eq!(dev.recording_state(), Some(RecordingState::Recording));
    }

    #[test]
    fn recording_hazard_is_advisory_only() {
        let mut dev = device(wire(&[(MODE_ACK, &[CMD_RECORDING, 1])]));
        dev.next_token().unwrap();

        dev.set_mode(&[RecordingState::NotRecording.into()]).unwrap();

        let (_, written) = dev.into_parts();
        assert_eq!(
            written_frames(written),
            vec![Frame::new(CMD_RECORDING, vec![0])]
        );
    }

    #[test]
    fn closed_link_poisons_until_reset() {
        let mut dev = device(wire(&[(MEASUREMENT, &[1, 0, 10])]));
        assert!(dev.next_token().is_ok());

        let err = dev.next_token().unwrap_err();
        assert!(matches!(err, SessionError::Frame(FrameError::ConnectionClosed)));
        assert!(dev.is_poisoned());
        assert!(matches!(dev.next_token(), Err(SessionError::Poisoned)));
        assert!(matches!(dev.get_recordings(), Err(SessionError::Poisoned)));

        dev.reset();
        assert!(!dev.is_poisoned());
        assert_eq!(dev.decoder().last_value(crate::Channel::SPL), None);
    }

    #[test]
    fn timeout_does_not_poison() {
        let link = TimeoutOnce::new(wire(&[(MEASUREMENT, &[1, 0, 10])]));
        let mut dev = Device::from_parts(link, Vec::new(), DeviceConfig::default());

        let err = dev.next_token().unwrap_err();
        assert!(err.is_timeout());
        assert!(!dev.is_poisoned());
        assert!(matches!(dev.next_token(), Ok(Token::Measurement(_))));
    }

    #[test]
    fn changes_skips_unchanged_measurements() {
        let mut dev = device(wire(&[
            (MEASUREMENT, &[1, 0, 10]),
            (MEASUREMENT, &[1, 0, 10]),
            (MODE_ACK, &[CMD_RANGE, 0]),
            (MEASUREMENT, &[1, 0, 10]),
            (MEASUREMENT, &[1, 0, 11]),
        ]));

        let tokens: Vec<Token> = dev.changes().filter_map(|t| t.ok()).collect();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0], Token::Measurement(m) if m.value.tenths() == 10));
        assert!(matches!(tokens[1], Token::ModeAck(_)));
        assert!(matches!(tokens[2], Token::Measurement(m) if m.value.tenths() == 11));
    }

    #[test]
    fn tokens_end_after_hard_error() {
        let mut dev = device(wire(&[(MEASUREMENT, &[1, 0, 10])]));
        let items: Vec<Result<Token>> = dev.tokens().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn io_error_poisons() {
        struct Unplugged;
        impl Read for Unplugged {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::BrokenPipe))
            }
        }

        let mut dev = Device::from_parts(Unplugged, Vec::new(), DeviceConfig::default());
        assert!(matches!(
            dev.next_token(),
            Err(SessionError::Frame(FrameError::Io(_)))
        ));
        assert!(dev.is_poisoned());
    }

    struct TimeoutOnce {
        timed_out: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl TimeoutOnce {
        fn new(bytes: Vec<u8>) -> Self {
            Self {
                timed_out: false,
                inner: Cursor::new(bytes),
            }
        }
    }

    impl Read for TimeoutOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.timed_out {
                self.timed_out = true;
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            self.inner.read(buf)
        }
    }
}
