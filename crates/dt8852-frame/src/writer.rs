use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::kind::kind_name;

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Writes complete frames to any `Write` stream.
///
/// Each frame goes out in a single buffered write followed by a flush, so the
/// device never sees two commands interleaved. Payloads longer than the
/// configured maximum are refused before anything reaches the port.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    max_payload: usize,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, &FrameConfig::default())
    }

    /// Create a new frame writer sharing the reader's payload limit.
    pub fn with_config(inner: T, config: &FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload: config.max_payload_size,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.kind, frame.payload.as_ref())
    }

    /// Encode and send a payload under a frame kind.
    pub fn send(&mut self, kind: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        self.buf.clear();
        encode_frame(kind, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        debug!(kind = kind_name(kind), len = payload.len(), "frame written");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::kind::{CMD_RANGE, CMD_RECORDING, DUMP_REQUEST};

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(CMD_RANGE, &[1]).unwrap();

        assert_eq!(writer.get_ref().as_slice(), &[0xA5, 0x41, 0x01, 0x01, 0x43]);
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(CMD_RANGE, &[1]).unwrap();
        writer.send(CMD_RECORDING, &[0]).unwrap();
        writer.write_frame(&Frame::empty(DUMP_REQUEST)).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().as_slice());

        let f1 = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f3 = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();

        assert_eq!((f1.kind, f1.payload.as_ref()), (CMD_RANGE, &[1u8][..]));
        assert_eq!((f2.kind, f2.payload.as_ref()), (CMD_RECORDING, &[0u8][..]));
        assert_eq!(f3.kind, DUMP_REQUEST);
        assert!(f3.payload.is_empty());
        assert!(wire.is_empty());
    }

    #[test]
    fn oversized_payload_rejected_before_write() {
        let mut writer = FrameWriter::new(Vec::new());

        let err = writer.send(CMD_RANGE, &[0u8; 300]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn payload_over_reader_limit_is_refused() {
        let mut writer = FrameWriter::new(Vec::new());

        let err = writer
            .send(DUMP_REQUEST, &[0u8; DEFAULT_MAX_PAYLOAD + 1])
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 13, max: DEFAULT_MAX_PAYLOAD }
        ));
        assert!(writer.get_ref().is_empty());

        let roomy = FrameConfig {
            max_payload_size: 32,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), &roomy);
        writer.send(DUMP_REQUEST, &[0u8; 13]).unwrap();
        assert_eq!(writer.get_ref().len(), 13 + 4);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(CMD_RANGE, &[0]).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(CMD_RECORDING, &[1]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), 5);
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(OneByteWriter::default());
        writer.send(CMD_RANGE, &[3]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, vec![0xA5, 0x41, 0x01, 0x03, 0x45]);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(CMD_RANGE, &[1]).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_decode() {
        let mut writer = FrameWriter::new(Vec::new());

        writer.send(DUMP_REQUEST, &[]).unwrap();

        let wire = writer.into_inner();
        let mut framed = crate::reader::FrameReader::new(Cursor::new(wire));
        let frame = framed.read_frame().unwrap();
        assert_eq!(frame, Frame::empty(DUMP_REQUEST));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match buf.first() {
                Some(b) => {
                    self.data.push(*b);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
