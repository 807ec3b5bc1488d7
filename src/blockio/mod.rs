//! Block-Buffered Reader Module
//!
//! Random access into the record body of a store file without one syscall
//! per field. [`BlockReader`] keeps a single cached window of whole device
//! blocks and serves field reads out of it; binary searches over a bucket
//! converge onto neighbouring records, so one window absorbs the tail of a
//! search and most of a batch.
//!
//! ## Caching
//!
//! A field read that falls outside the window triggers one refill: the
//! window is repositioned to the block boundary at or below the field's
//! start and sized to the whole blocks that cover the field's **end** as
//! well, so a field straddling a block boundary is always served from one
//! window. The window never grows beyond what the current field needs;
//! there is no read-ahead and no second buffer.
//!
//! The block size is probed from the file's metadata (`st_blksize`); a
//! probe failure or a zero answer falls back to [`FALLBACK_BLOCK_SIZE`]
//! silently — a wrong block size costs performance, never correctness.
//!
//! # Guarantees
//!
//! - Field reads are position-pure: the bytes returned for a field never
//!   depend on which reads came before.
//! - A field reaching past end-of-file is an `UnexpectedEof` error, not a
//!   short slice.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Imports
// ------------------------------------------------------------------------------------------------

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::os::unix::fs::MetadataExt;

use tracing::{debug, trace};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Window granularity when the device block size cannot be probed.
pub const FALLBACK_BLOCK_SIZE: usize = 8 * 1024;

// ------------------------------------------------------------------------------------------------
// BlockReader
// ------------------------------------------------------------------------------------------------

/// Read-only, block-buffered view of the record body of an open file.
///
/// `base` is the absolute offset where record 0 starts (the header size);
/// all record arithmetic is relative to it.
pub struct BlockReader {
    file: File,
    base: u64,
    block_size: usize,
    /// Absolute file offset of `window[0]`.
    window_start: u64,
    window: Vec<u8>,
    refills: usize,
}

impl BlockReader {
    /// Creates a reader over `file`, probing the device block size.
    pub fn new(file: File, base: u64) -> BlockReader {
        let block_size = match file.metadata() {
            Ok(meta) if meta.blksize() > 0 => meta.blksize() as usize,
            Ok(_) => FALLBACK_BLOCK_SIZE,
            Err(error) => {
                debug!(
                    "Block size probe failed ({}), using {} B fallback",
                    error, FALLBACK_BLOCK_SIZE
                );
                FALLBACK_BLOCK_SIZE
            }
        };
        BlockReader::with_block_size(file, base, block_size)
    }

    /// Creates a reader with an explicit window granularity. Useful for
    /// tuning and for tests that need deterministic block boundaries.
    pub fn with_block_size(file: File, base: u64, block_size: usize) -> BlockReader {
        BlockReader {
            file,
            base,
            block_size: block_size.max(1),
            window_start: 0,
            window: Vec::new(),
            refills: 0,
        }
    }

    /// Window granularity in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of window refills performed so far.
    pub fn refills(&self) -> usize {
        self.refills
    }

    /// Reads the field at byte range `[field_offset, field_offset +
    /// field_len)` of record `record`, where records are `stride` bytes
    /// apart starting at `base`.
    ///
    /// The returned slice borrows the cache and is valid until the next
    /// read.
    pub fn read_field(
        &mut self,
        record: usize,
        stride: usize,
        field_offset: usize,
        field_len: usize,
    ) -> io::Result<&[u8]> {
        let position = self.base + (record * stride + field_offset) as u64;
        let end = position + field_len as u64;

        let window_end = self.window_start + self.window.len() as u64;
        if position < self.window_start || end > window_end {
            self.refill(position, end)?;
        }

        let at = (position - self.window_start) as usize;
        Ok(&self.window[at..at + field_len])
    }

    /// Repositions the window to the whole blocks covering `[position, end)`.
    fn refill(&mut self, position: u64, end: u64) -> io::Result<()> {
        let block = self.block_size as u64;
        let start = position - position % block;
        let span = ((end - start).div_ceil(block) * block) as usize;

        self.window.resize(span, 0);
        let mut filled = 0;
        while filled < span {
            match self.file.read_at(&mut self.window[filled..], start + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
        self.window.truncate(filled);
        self.window_start = start;
        self.refills += 1;
        trace!(
            "Window refill #{}: [{}, {}) of {} requested",
            self.refills,
            start,
            start + filled as u64,
            span
        );

        if end > start + filled as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "field at [{}, {}) extends past end of file ({})",
                    position,
                    end,
                    start + filled as u64
                ),
            ));
        }
        Ok(())
    }
}
