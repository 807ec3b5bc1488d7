//! Store Operations Module
//!
//! The three operations that touch a store file — building
//! ([`builder`]), batched lookup ([`reader`]), and record removal
//! ([`compactor`]) — plus the plumbing they share: the record layout,
//! key padding, and query partitioning.
//!
//! ## On-disk layout
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────┐
//! │ header           │ body                                         │
//! │ 65 536 counters  │ bucket runs, ascending bucket id;            │
//! │ × 3 B big-endian │ records strictly ascending inside a run      │
//! └──────────────────┴──────────────────────────────────────────────┘
//!
//! record = key, NUL-padded to key_len ++ value, exactly value_len
//! ```
//!
//! The key and value widths are per-store configuration ([`Layout`]),
//! not stored in the file; opening a store with the wrong layout fails
//! the header size check rather than returning garbage.
//!
//! # Guarantees
//!
//! - **Atomic replacement:** every mutation writes a finished temporary
//!   and renames it over the store. A crash leaves either the old file
//!   or the new one, never a hybrid.
//! - **Read-only lookups:** fetch never writes, so any number of
//!   readers can share a store under a shared lock.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod builder;
pub mod compactor;
pub mod reader;

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Imports
// ------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use crate::StoreError;
use crate::blockio::BlockReader;
use crate::bucket::bucket_of;
use crate::search::SortedView;

// ------------------------------------------------------------------------------------------------
// Layout
// ------------------------------------------------------------------------------------------------

/// Field widths of one record: `key_len` bytes of NUL-padded key
/// followed by `value_len` bytes of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    key_len: usize,
    value_len: usize,
}

impl Layout {
    /// Creates a layout. Both fields must be at least one byte wide.
    pub fn new(key_len: usize, value_len: usize) -> Result<Layout, StoreError> {
        if key_len == 0 {
            return Err(StoreError::InvalidLayout(
                "key field width must be at least 1 byte".into(),
            ));
        }
        if value_len == 0 {
            return Err(StoreError::InvalidLayout(
                "value field width must be at least 1 byte".into(),
            ));
        }
        Ok(Layout { key_len, value_len })
    }

    /// Width of the key field.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Width of the value field.
    pub fn value_len(&self) -> usize {
        self.value_len
    }

    /// Width of one whole record.
    pub fn record_size(&self) -> usize {
        self.key_len + self.value_len
    }
}

// ------------------------------------------------------------------------------------------------
// Key padding
// ------------------------------------------------------------------------------------------------

/// NUL-pads `key` to the key field width. The caller has already
/// checked `key.len() <= key_len`.
pub(crate) fn pad_key(key: &str, key_len: usize) -> Vec<u8> {
    let mut padded = vec![0u8; key_len];
    padded[..key.len()].copy_from_slice(key.as_bytes());
    padded
}

// ------------------------------------------------------------------------------------------------
// Query partitioning
// ------------------------------------------------------------------------------------------------

/// One deduplicated query key. `padded` is `None` when the key is wider
/// than the key field — such a key can never have been stored, so the
/// operation reports it absent without searching.
pub(crate) struct Query {
    pub key: String,
    pub padded: Option<Vec<u8>>,
}

/// Dedupes `keys` and groups them by bucket.
///
/// Buckets iterate in ascending id order and each bucket's queries are
/// ascending by raw key bytes, which is exactly the order the header
/// cursor and the batched search want. NUL padding preserves that order
/// (keys never contain NUL), so the padded queries are sorted too.
pub(crate) fn partition_queries<K>(layout: Layout, keys: &[K]) -> BTreeMap<usize, Vec<Query>>
where
    K: AsRef<str>,
{
    let unique: BTreeSet<&str> = keys.iter().map(|k| k.as_ref()).collect();

    let mut by_bucket: BTreeMap<usize, Vec<Query>> = BTreeMap::new();
    for key in unique {
        let padded = (key.len() <= layout.key_len()).then(|| pad_key(key, layout.key_len()));
        by_bucket.entry(bucket_of(key)).or_default().push(Query {
            key: key.to_string(),
            padded,
        });
    }
    by_bucket
}

// ------------------------------------------------------------------------------------------------
// RunView — one bucket's records as a searchable view
// ------------------------------------------------------------------------------------------------

/// [`SortedView`] over the key fields of one bucket run, backed by the
/// shared block reader.
pub(crate) struct RunView<'a> {
    pub reader: &'a mut BlockReader,
    /// Global index of the run's first record.
    pub start: u64,
    pub count: u32,
    pub layout: Layout,
}

impl SortedView for RunView<'_> {
    fn len(&self) -> usize {
        self.count as usize
    }

    fn field(&mut self, index: usize) -> io::Result<&[u8]> {
        self.reader.read_field(
            self.start as usize + index,
            self.layout.record_size(),
            0,
            self.layout.key_len(),
        )
    }
}
