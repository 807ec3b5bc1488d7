//! # spikedb
//!
//! The on-disk ownership database of a source-based package manager: a
//! **bucket-indexed, fixed-width key-value store** mapping installed
//! file paths (and scroll identifiers) to the hashes of the scrolls
//! that own them. Built for batch-heavy workloads — an install or
//! removal touches thousands of paths in one call — on a format simple
//! enough to audit with `xxd`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spikedb::{Layout, Store};
//!
//! // 64-byte path keys, 32-byte ownership hashes.
//! let layout = Layout::new(64, 32).unwrap();
//! let store = Store::new("/var/lib/spike/owners.db", layout);
//!
//! // Build from scratch (atomically replaces any existing file).
//! store
//!     .build(&[
//!         ("usr/bin/spike", [0xAB; 32]),
//!         ("usr/share/doc/spike/README", [0xCD; 32]),
//!     ])
//!     .unwrap();
//!
//! // Batched lookup; absent keys come back as None.
//! let owners = store.fetch(&["usr/bin/spike", "usr/bin/missing"]).unwrap();
//! for (path, owner) in &owners {
//!     match owner {
//!         Some(hash) => println!("{path} owned by {hash:02x?}"),
//!         None => println!("{path} unowned"),
//!     }
//! }
//!
//! // Merge more pairs into the existing store.
//! store.insert(&[("usr/bin/spike-lint", [0xEF; 32])]).unwrap();
//!
//! // Remove records; keys that were absent are reported, not errors.
//! let unowned = store.remove(&["usr/share/doc/spike/README"]).unwrap();
//! assert!(unowned.is_empty());
//! ```
//!
//! ## Features
//!
//! - **Bucket-partitioned index** — 65 536 buckets derived from path
//!   initials; lookups search one bucket's run, never the whole file.
//! - **Batched binary search** — each bucket's queries resolve in one
//!   divide-and-conquer pass, O(log n + m) comparisons per bucket.
//! - **Block-buffered reads** — record fields are served from a single
//!   block-aligned window sized to the device block size.
//! - **Atomic rewrites** — build, insert, and remove write a finished
//!   temporary and rename it over the store.
//! - **Advisory locking** — shared/exclusive `flock` handles so many
//!   readers or one writer can coordinate across processes.

pub mod blockio;
pub mod bucket;
pub mod header;
pub mod lock;
pub mod search;
pub mod store;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use lock::LockFile;
pub use store::Layout;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by [`Store`] operations.
///
/// A key that is merely absent is never an error — lookups report it as
/// `None` and removals list it as not-found.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A layout field width is unusable.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// A key is wider than the layout's key field.
    #[error("key {key:?} is wider than the {max} byte key field")]
    KeyTooLong { key: String, max: usize },

    /// A value does not match the layout's value field width.
    #[error("value is {actual} bytes, expected exactly {expected}")]
    ValueLength { expected: usize, actual: usize },

    /// A bucket holds more records than its 3-byte counter can express.
    #[error("bucket {bucket:#06x} holds {count} records, beyond the 24-bit counter")]
    BucketOverflow { bucket: usize, count: u64 },

    /// The counter table disagrees with the file it fronts.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// Store handle
// ------------------------------------------------------------------------------------------------

/// Handle to one store file: a path plus the record layout to read it
/// with.
///
/// The handle holds no open file and no lock — each operation opens,
/// works, and closes. Locking is the caller's contract: hold
/// [`Store::lock_shared`] around [`Store::fetch`] and
/// [`Store::lock_exclusive`] around anything that rewrites the file
/// when other processes may touch the store.
///
/// # Concurrency
///
/// Operations are single-threaded and blocking. Mutations replace the
/// file atomically, so a reader that opened the store before a rewrite
/// keeps reading the old, complete image.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    layout: Layout,
}

impl Store {
    /// Creates a handle for the store at `path`. No file is touched
    /// until an operation runs.
    pub fn new(path: impl AsRef<Path>, layout: Layout) -> Store {
        Store {
            path: path.as_ref().to_path_buf(),
            layout,
        }
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record layout this handle reads and writes with.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    // --------------------------------------------------------------------------------------------
    // Write operations
    // --------------------------------------------------------------------------------------------

    /// Builds the store from `pairs`, atomically replacing any existing
    /// file.
    ///
    /// Pairs may arrive in any order; duplicate keys keep their last
    /// value. An empty slice builds a valid empty store.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyTooLong`] or [`StoreError::ValueLength`] if a
    /// pair does not fit the layout; nothing is written in that case.
    pub fn build<K, V>(&self, pairs: &[(K, V)]) -> Result<(), StoreError>
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        store::builder::build(&self.path, self.layout, pairs)
    }

    /// Merges `pairs` into the existing store, overwriting stored
    /// values for keys already present.
    ///
    /// # Errors
    ///
    /// Pair validation as in [`Store::build`]; [`StoreError::Io`] if
    /// the store does not exist — creating it is [`Store::build`]'s
    /// job.
    pub fn insert<K, V>(&self, pairs: &[(K, V)]) -> Result<(), StoreError>
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        store::builder::insert(&self.path, self.layout, pairs)
    }

    /// Removes `keys` from the store, rewriting it without them.
    ///
    /// Returns the distinct keys that were not present. Removing
    /// nothing leaves the file byte-identical; a batch where only some
    /// keys match removes those and reports the rest.
    pub fn remove<K>(&self, keys: &[K]) -> Result<Vec<String>, StoreError>
    where
        K: AsRef<str>,
    {
        store::compactor::remove(&self.path, self.layout, keys)
    }

    // --------------------------------------------------------------------------------------------
    // Read operations
    // --------------------------------------------------------------------------------------------

    /// Looks up `keys`, returning one `(key, value)` entry per distinct
    /// input key — `None` for keys not in the store.
    ///
    /// Results are grouped by ascending bucket, ascending key within a
    /// bucket.
    pub fn fetch<K>(&self, keys: &[K]) -> Result<Vec<(String, Option<Vec<u8>>)>, StoreError>
    where
        K: AsRef<str>,
    {
        store::reader::fetch(&self.path, self.layout, keys)
    }

    // --------------------------------------------------------------------------------------------
    // Locking
    // --------------------------------------------------------------------------------------------

    /// Path of the store's advisory lock file: the store path with
    /// `.lock` appended. The lock never lives on the store file itself,
    /// which rewrites replace.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Takes the shared (reader) lock, blocking while a writer holds
    /// the exclusive lock.
    pub fn lock_shared(&self) -> Result<LockFile, StoreError> {
        Ok(LockFile::shared(self.lock_path())?)
    }

    /// Takes the exclusive (writer) lock, blocking while anyone else
    /// holds the lock.
    pub fn lock_exclusive(&self) -> Result<LockFile, StoreError> {
        Ok(LockFile::exclusive(self.lock_path())?)
    }
}
