//! Store writer — builds a complete store file from key/value pairs.
//!
//! [`build`] creates or replaces a store from scratch; [`insert`] merges
//! new pairs into an existing store and rewrites it. Both funnel into
//! the same write path, so every store file on disk was produced the
//! same way.
//!
//! # Input requirements
//!
//! - Keys are at most `key_len` bytes; longer keys fail the whole
//!   operation before anything is written.
//! - Values are exactly `value_len` bytes.
//! - Pairs may arrive in any order and may repeat a key — the last
//!   occurrence wins, and [`insert`] overwrites a stored key the same
//!   way.
//!
//! # Output guarantees
//!
//! - Counter table at the front, one run per bucket in ascending bucket
//!   order, records strictly ascending inside each run.
//! - A bucket holding more records than a 3-byte counter can express
//!   fails the build instead of wrapping.
//!
//! # Atomicity
//!
//! 1. Write everything to `path.tmp`.
//! 2. Flush and sync the file.
//! 3. Rename `path.tmp` → `path` atomically.
//!
//! A crash cannot produce a partially-written store.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions, rename};
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::StoreError;
use crate::bucket::{BUCKET_COUNT, bucket_of};
use crate::header::{HEADER_SIZE, HeaderTable, MAX_BUCKET_RECORDS};
use crate::store::{Layout, pad_key};

// ------------------------------------------------------------------------------------------------
// Partitioning
// ------------------------------------------------------------------------------------------------

/// Validated build input: bucket id → padded key → value. Both maps are
/// ordered, so iterating writes the file in its on-disk order.
pub(crate) type Partition = BTreeMap<usize, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Validates `pairs` against `layout` and groups them by bucket.
///
/// The bucket id is derived from the original unpadded key; ordering
/// inside a bucket follows the padded key bytes, which ranks the same
/// as the raw keys.
pub(crate) fn partition_pairs<K, V>(layout: Layout, pairs: &[(K, V)]) -> Result<Partition, StoreError>
where
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let mut partition = Partition::new();
    for (key, value) in pairs {
        let key = key.as_ref();
        let value = value.as_ref();

        if key.len() > layout.key_len() {
            return Err(StoreError::KeyTooLong {
                key: key.to_string(),
                max: layout.key_len(),
            });
        }
        if value.len() != layout.value_len() {
            return Err(StoreError::ValueLength {
                expected: layout.value_len(),
                actual: value.len(),
            });
        }

        partition
            .entry(bucket_of(key))
            .or_default()
            .insert(pad_key(key, layout.key_len()), value.to_vec());
    }
    Ok(partition)
}

// ------------------------------------------------------------------------------------------------
// Write path
// ------------------------------------------------------------------------------------------------

/// Writes a complete store image for `partition` and renames it over
/// `path`.
pub(crate) fn write_store(path: &Path, partition: &Partition) -> Result<(), StoreError> {
    let mut header = HeaderTable::new();
    for (&bucket, run) in partition {
        if run.len() as u64 > u64::from(MAX_BUCKET_RECORDS) {
            return Err(StoreError::BucketOverflow {
                bucket,
                count: run.len() as u64,
            });
        }
        header.set(bucket, run.len() as u32)?;
    }

    debug!(
        records = header.total_records(),
        buckets = partition.len(),
        path = %path.display(),
        "writing store image"
    );

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(&mut file);

    writer.write_all(&header.to_bytes())?;
    for run in partition.values() {
        for (padded, value) in run {
            writer.write_all(padded)?;
            writer.write_all(value)?;
        }
    }

    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    rename(&tmp_path, path)?;
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Build
// ------------------------------------------------------------------------------------------------

/// Builds a store from `pairs`, replacing any existing file at `path`.
///
/// An empty `pairs` builds a valid empty store: the zeroed counter
/// table and no body.
pub fn build<K, V>(path: &Path, layout: Layout, pairs: &[(K, V)]) -> Result<(), StoreError>
where
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let partition = partition_pairs(layout, pairs)?;
    write_store(path, &partition)?;

    info!(
        records = pairs.len(),
        path = %path.display(),
        "Built store"
    );
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Insert
// ------------------------------------------------------------------------------------------------

/// Merges `pairs` into the existing store at `path` and rewrites it.
///
/// Keys already present are overwritten. The store must exist —
/// creating one is [`build`]'s job — and must pass the header size
/// check before any merge happens.
pub fn insert<K, V>(path: &Path, layout: Layout, pairs: &[(K, V)]) -> Result<(), StoreError>
where
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let incoming = partition_pairs(layout, pairs)?;

    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if file_len < HEADER_SIZE as u64 {
        return Err(StoreError::CorruptHeader(format!(
            "file is {} bytes, shorter than the {} byte header",
            file_len, HEADER_SIZE
        )));
    }
    let mmap = unsafe { Mmap::map(&file)? };

    let header = HeaderTable::from_bytes(&mmap)?;
    header.validate(file_len, layout.record_size())?;

    // Rebuild the partition from the file. Bucket membership comes from
    // the counters, not from re-deriving bucket ids, so the rewrite
    // preserves placement even for keys a newer derivation would file
    // elsewhere.
    let mut partition = incoming;
    let body = &mmap[HEADER_SIZE..];
    let record_size = layout.record_size();
    let mut record = 0usize;
    for bucket in 0..BUCKET_COUNT {
        let count = header.count(bucket) as usize;
        if count == 0 {
            continue;
        }
        let run = partition.entry(bucket).or_default();
        for _ in 0..count {
            let at = record * record_size;
            let padded = &body[at..at + layout.key_len()];
            let value = &body[at + layout.key_len()..at + record_size];
            // Incoming pairs win over stored records.
            run.entry(padded.to_vec()).or_insert_with(|| value.to_vec());
            record += 1;
        }
    }

    write_store(path, &partition)?;

    info!(
        inserted = pairs.len(),
        records = partition.values().map(BTreeMap::len).sum::<usize>(),
        path = %path.display(),
        "Inserted into store"
    );
    Ok(())
}
