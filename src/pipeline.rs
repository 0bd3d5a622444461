//! Bounded byte-stream handoff between pipeline stages
//!
//! A handoff is an in-process pipe: the upstream stage writes into a
//! [`HandoffWriter`], the downstream stage reads from the matching
//! [`HandoffReader`]. Data travels as owned chunks over a
//! `sync_channel`, so a writer blocks once `capacity` chunks are waiting
//! and a reader blocks until the next chunk arrives.
//!
//! Closing rules:
//! - dropping the writer is end of input for the reader
//! - [`HandoffWriter::close_with_error`] makes the reader's next read fail
//! - dropping the reader makes every later write fail with `BrokenPipe`

use crate::error::HandoffError;
use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

/// Default number of chunks that may be in flight per handoff
pub const DEFAULT_HANDOFF_CAPACITY: usize = 4;

/// Largest chunk a single write sends
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

enum Packet {
    Data(Vec<u8>),
    Failed(String),
}

/// Create a connected writer/reader pair holding at most `capacity` chunks
pub fn handoff(capacity: usize) -> (HandoffWriter, HandoffReader) {
    let (sender, receiver) = sync_channel(capacity.max(1));
    (
        HandoffWriter { sender },
        HandoffReader {
            receiver,
            chunk: Vec::new(),
            pos: 0,
            failure: None,
        },
    )
}

pub struct HandoffWriter {
    sender: SyncSender<Packet>,
}

impl HandoffWriter {
    /// Close the stream so the reader sees `message` as an I/O error
    pub fn close_with_error(self, message: String) {
        // A reader that is already gone has nothing left to tell
        if self.sender.send(Packet::Failed(message)).is_err() {
            tracing::trace!("handoff reader gone before failure could be delivered");
        }
    }
}

impl Write for HandoffWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let len = buf.len().min(MAX_CHUNK_SIZE);
        self.sender
            .send(Packet::Data(buf[..len].to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, HandoffError::ReaderGone))?;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct HandoffReader {
    receiver: Receiver<Packet>,
    chunk: Vec<u8>,
    pos: usize,
    failure: Option<String>,
}

impl HandoffReader {
    fn upstream_error(message: &str) -> io::Error {
        io::Error::other(HandoffError::UpstreamFailed(message.to_string()))
    }
}

impl Read for HandoffReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos == self.chunk.len() {
            if let Some(message) = &self.failure {
                return Err(Self::upstream_error(message));
            }

            match self.receiver.recv() {
                Ok(Packet::Data(data)) => {
                    self.chunk = data;
                    self.pos = 0;
                }
                Ok(Packet::Failed(message)) => {
                    let err = Self::upstream_error(&message);
                    self.failure = Some(message);
                    return Err(err);
                }
                // Writer dropped: clean end of stream
                Err(_) => return Ok(0),
            }
        }

        let available = &self.chunk[self.pos..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.pos += len;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_data_then_eof() {
        let (mut writer, mut reader) = handoff(2);
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        drop(writer);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_small_reads_span_chunks() {
        let (mut writer, mut reader) = handoff(4);
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"de").unwrap();
        drop(writer);

        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn test_close_with_error_reaches_reader() {
        let (mut writer, mut reader) = handoff(2);
        writer.write_all(b"partial").unwrap();
        writer.close_with_error("line 3 is longer than 8 bytes".to_string());

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(out, b"partial");
        assert!(err.to_string().contains("line 3 is longer than 8 bytes"));

        // The failure is sticky
        assert!(reader.read(&mut [0u8; 4]).is_err());
    }

    #[test]
    fn test_writer_sees_broken_pipe_when_reader_dropped() {
        let (mut writer, reader) = handoff(1);
        drop(reader);
        let err = writer.write_all(b"nobody listening").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "downstream closed");
    }

    #[test]
    fn test_large_write_is_chunked() {
        let (mut writer, reader) = handoff(1);
        let payload = vec![b'x'; MAX_CHUNK_SIZE * 3 + 17];
        let expected = payload.clone();

        let consumer = thread::spawn(move || {
            let mut reader = reader;
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            out
        });

        writer.write_all(&payload).unwrap();
        drop(writer);
        assert_eq!(consumer.join().unwrap(), expected);
    }

    #[test]
    fn test_backpressure_blocks_writer_until_read() {
        let (mut writer, mut reader) = handoff(1);
        let producer = thread::spawn(move || {
            for i in 0..16u8 {
                writer.write_all(&[i]).unwrap();
            }
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        producer.join().unwrap();
        assert_eq!(out, (0..16u8).collect::<Vec<_>>());
    }
}
