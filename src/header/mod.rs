//! Header Table Module
//!
//! The fixed-size table at the front of every store file: one record
//! counter per bucket. Together with the record size it fully determines
//! where every bucket's run starts, so lookups never scan.
//!
//! ## On-disk layout
//!
//! ```text
//! ┌────────────────┬────────────────┬─────┬────────────────────┐
//! │ bucket 0 count │ bucket 1 count │ ... │ bucket 65535 count │
//! └────────────────┴────────────────┴─────┴────────────────────┘
//!   3 bytes, big-endian, per bucket            = 196 608 bytes
//! ```
//!
//! A counter is an unsigned 24-bit big-endian integer, so one bucket holds
//! at most [`MAX_BUCKET_RECORDS`] records. The body begins immediately
//! after the table; bucket `b`'s run starts `sum(counts[..b])` records in.
//!
//! ## Cumulative cursor
//!
//! Store operations visit buckets in ascending order, so [`HeaderTable`]
//! keeps a cursor (`position`, `offset`) instead of re-summing prefixes:
//! [`HeaderTable::resolve`] continues forward from the last resolved
//! bucket and restarts from zero only when asked to go backwards. An
//! ascending batch costs one pass over the table in total.
//!
//! # Guarantees
//!
//! - **Consistency check:** [`HeaderTable::validate`] enforces
//!   `header + total records × record size == file size`, catching
//!   truncation and layout mismatches before any record read.
//! - **Bounded counters:** [`HeaderTable::set`] refuses counts beyond the
//!   24-bit ceiling, so serialization can never wrap.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Imports
// ------------------------------------------------------------------------------------------------

use std::fs::File;
use std::os::unix::fs::FileExt;

use crate::StoreError;
use crate::bucket::BUCKET_COUNT;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Width of one on-disk bucket counter.
pub const COUNTER_SIZE: usize = 3;

/// Total header size: one counter per bucket.
pub const HEADER_SIZE: usize = COUNTER_SIZE * BUCKET_COUNT;

/// Largest record count one bucket counter can hold.
pub const MAX_BUCKET_RECORDS: u32 = 0x00FF_FFFF;

// ------------------------------------------------------------------------------------------------
// Counter codec
// ------------------------------------------------------------------------------------------------

/// Encodes a counter as 3 big-endian bytes. `count` must not exceed
/// [`MAX_BUCKET_RECORDS`]; [`HeaderTable::set`] guards that upstream.
pub fn encode_counter(count: u32) -> [u8; 3] {
    let be = count.to_be_bytes();
    [be[1], be[2], be[3]]
}

/// Decodes 3 big-endian bytes into a counter.
pub fn decode_counter(bytes: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

// ------------------------------------------------------------------------------------------------
// HeaderTable
// ------------------------------------------------------------------------------------------------

/// In-memory image of the bucket counter table, with the cumulative
/// cursor used to resolve bucket runs in ascending order.
#[derive(Debug)]
pub struct HeaderTable {
    counts: Vec<u32>,
    /// Next bucket the cursor would accumulate; `offset` is the record
    /// index where bucket `position`'s run starts.
    position: usize,
    offset: u64,
}

impl HeaderTable {
    /// An all-zero table: the header of an empty store.
    pub fn new() -> HeaderTable {
        HeaderTable {
            counts: vec![0; BUCKET_COUNT],
            position: 0,
            offset: 0,
        }
    }

    /// Parses a table from raw header bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<HeaderTable, StoreError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::CorruptHeader(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        let mut counts = Vec::with_capacity(BUCKET_COUNT);
        for chunk in bytes[..HEADER_SIZE].chunks_exact(COUNTER_SIZE) {
            counts.push(decode_counter([chunk[0], chunk[1], chunk[2]]));
        }
        Ok(HeaderTable {
            counts,
            position: 0,
            offset: 0,
        })
    }

    /// Reads the table from the front of an open store file.
    ///
    /// A file too short to hold the header is corrupt, not an I/O error.
    pub fn read_from(file: &File) -> Result<HeaderTable, StoreError> {
        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(StoreError::CorruptHeader(format!(
                "file is {} bytes, shorter than the {} byte header",
                file_len, HEADER_SIZE
            )));
        }
        let mut bytes = vec![0u8; HEADER_SIZE];
        file.read_exact_at(&mut bytes, 0)?;
        HeaderTable::from_bytes(&bytes)
    }

    /// Serializes the table to its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        for &count in &self.counts {
            bytes.extend_from_slice(&encode_counter(count));
        }
        bytes
    }

    /// Record count of `bucket`.
    pub fn count(&self, bucket: usize) -> u32 {
        self.counts[bucket]
    }

    /// Total records across all buckets.
    pub fn total_records(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Sets `bucket`'s record count, refusing counts the 3-byte counter
    /// cannot hold.
    pub fn set(&mut self, bucket: usize, count: u32) -> Result<(), StoreError> {
        if count > MAX_BUCKET_RECORDS {
            return Err(StoreError::BucketOverflow {
                bucket,
                count: u64::from(count),
            });
        }
        self.counts[bucket] = count;
        self.reset_cursor();
        Ok(())
    }

    /// Subtracts `removed` records from `bucket`. The caller only removes
    /// records it found in the bucket, so the count never underflows.
    pub fn decrement(&mut self, bucket: usize, removed: u32) {
        self.counts[bucket] -= removed;
        self.reset_cursor();
    }

    /// Resolves `bucket` to `(first record index, record count)`.
    ///
    /// Ascending calls continue the cursor forward; a backwards call
    /// restarts the accumulation from bucket 0. Resolving the same
    /// bucket repeatedly is stable.
    pub fn resolve(&mut self, bucket: usize) -> (u64, u32) {
        if bucket < self.position {
            self.position = 0;
            self.offset = 0;
        }
        while self.position < bucket {
            self.offset += u64::from(self.counts[self.position]);
            self.position += 1;
        }
        (self.offset, self.counts[bucket])
    }

    /// Checks the size invariant: every record the counters promise is
    /// present, and no trailing garbage follows.
    pub fn validate(&self, file_len: u64, record_size: usize) -> Result<(), StoreError> {
        let expected = HEADER_SIZE as u64 + self.total_records() * record_size as u64;
        if file_len != expected {
            return Err(StoreError::CorruptHeader(format!(
                "file is {} bytes but counters promise {} ({} records of {} bytes after the header)",
                file_len,
                expected,
                self.total_records(),
                record_size
            )));
        }
        Ok(())
    }

    // Mutation invalidates the accumulated prefix.
    fn reset_cursor(&mut self) {
        self.position = 0;
        self.offset = 0;
    }
}

impl Default for HeaderTable {
    fn default() -> Self {
        HeaderTable::new()
    }
}
