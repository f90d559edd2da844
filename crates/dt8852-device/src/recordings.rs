use std::io::{Read, Write};
use std::iter::FusedIterator;

use tracing::{debug, info};

use crate::device::Device;
use crate::error::Result;
use crate::token::{RecordingRecord, Token};

/// Finite stream of stored samples returned by [`Device::get_recordings`].
///
/// Yields every [`RecordingRecord`] in wire order and stops at the
/// end-of-recordings marker. Live measurements, acks and unknown tokens that
/// arrive in between are skipped.
///
/// A read timeout is yielded as an error but leaves the stream open, so the
/// caller may keep pulling once the device resumes. Any other error ends it.
pub struct Recordings<'a, R, W> {
    device: &'a mut Device<R, W>,
    records: usize,
    done: bool,
}

impl<'a, R: Read, W: Write> Recordings<'a, R, W> {
    pub(crate) fn new(device: &'a mut Device<R, W>) -> Self {
        Self {
            device,
            records: 0,
            done: false,
        }
    }

    /// Number of records yielded so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Whether the end marker (or an error) has been seen.
    pub fn is_finished(&self) -> bool {
        self.done
    }
}

impl<R: Read, W: Write> Iterator for Recordings<'_, R, W> {
    type Item = Result<RecordingRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.device.next_token() {
                Ok(Token::RecordingRecord(record)) => {
                    self.records += 1;
                    return Some(Ok(record));
                }
                Ok(Token::EndOfRecordings) => {
                    info!(records = self.records, "recordings dump complete");
                    self.done = true;
                }
                Ok(other) => debug!(token = other.name(), "skipping token during dump"),
                Err(err) if err.is_timeout() => return Some(Err(err)),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<R: Read, W: Write> FusedIterator for Recordings<'_, R, W> {}
