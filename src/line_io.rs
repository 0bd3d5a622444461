//! Line-oriented reading and writing
//!
//! Input lines are split on `\n` with one trailing `\r` removed, so CRLF
//! input comes out as LF. Every emitted line gets exactly one `\n`. Lines are
//! raw bytes: text in other encodings passes through untouched.

use crate::error::ExecError;
use std::io::{self, BufRead, Read, Write};

/// Longest accepted line, excluding its terminator
pub const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Buffer size for both reading and writing
pub const IO_BUFFER_SIZE: usize = 64 * 1024;

/// Reads lines one at a time, tracking the 1-based line number
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    max_line_bytes: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
            max_line_bytes,
        }
    }

    /// Number of the line most recently returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line without its terminator, or `None` at end of input
    pub fn next_line(&mut self) -> Result<Option<Vec<u8>>, ExecError> {
        self.buf.clear();

        // One byte past the limit is enough to tell an oversized line apart
        let limit = self.max_line_bytes as u64 + 1;
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        self.line_number += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        } else if self.buf.len() > self.max_line_bytes {
            return Err(ExecError::LineTooLong {
                line: self.line_number,
                limit: self.max_line_bytes,
            });
        }

        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        Ok(Some(std::mem::take(&mut self.buf)))
    }
}

impl<R: Read> LineReader<io::BufReader<R>> {
    pub fn buffered(reader: R, max_line_bytes: usize) -> Self {
        Self::new(io::BufReader::with_capacity(IO_BUFFER_SIZE, reader), max_line_bytes)
    }
}

/// Write `line` followed by a single `\n`
pub fn write_line<W: Write>(output: &mut W, line: &[u8]) -> io::Result<()> {
    output.write_all(line)?;
    output.write_all(b"\n")
}
