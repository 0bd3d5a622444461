//! Input sources
//!
//! A query reads from stdin or from a file. Large files are memory-mapped and
//! read straight out of the page cache; small files go through a plain
//! `File`, where mapping overhead would outweigh the copy it saves.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use crate::error_helpers;

/// Default size at which files are memory-mapped
pub const DEFAULT_MMAP_THRESHOLD: u64 = 1024 * 1024;

/// A readable, sendable byte source for one execution
pub enum InputSource {
    Stdin(io::Stdin),
    File(File),
    Mapped(Cursor<Mmap>),
}

impl InputSource {
    pub fn stdin() -> Self {
        InputSource::Stdin(io::stdin())
    }

    /// Open `path`, mapping it when it is at least `mmap_threshold` bytes
    pub fn open(path: &Path, mmap_threshold: u64) -> Result<Self> {
        let file = File::open(path).map_err(|e| error_helpers::open_error(path, e))?;

        let len = file
            .metadata()
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?
            .len();

        if len == 0 || len < mmap_threshold {
            return Ok(InputSource::File(file));
        }

        // SAFETY: read-only map; the file must not be truncated while mapped
        match unsafe { Mmap::map(&file) } {
            Ok(map) => {
                tracing::debug!(path = %path.display(), bytes = len, "memory-mapped input");
                Ok(InputSource::Mapped(Cursor::new(map)))
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "mmap failed, reading file");
                Ok(InputSource::File(file))
            }
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, InputSource::Mapped(_))
    }
}

impl Read for InputSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputSource::Stdin(stdin) => stdin.read(buf),
            InputSource::File(file) => file.read(buf),
            InputSource::Mapped(cursor) => cursor.read(buf),
        }
    }
}
