//! Store reader — batched key lookup.
//!
//! One [`fetch`] call resolves a whole batch of keys: queries are
//! deduplicated, grouped by bucket, and each bucket's group is resolved
//! with one batched binary search over the bucket's run. The block
//! reader's window soaks up the adjacent record reads, so a dense batch
//! costs far fewer syscalls than independent lookups.
//!
//! Absence is an answer here, not an error: a key that is not in the
//! store comes back as `None`.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::StoreError;
use crate::blockio::BlockReader;
use crate::header::{HEADER_SIZE, HeaderTable};
use crate::search::multi_search;
use crate::store::{Layout, RunView, partition_queries};

// ------------------------------------------------------------------------------------------------
// Fetch
// ------------------------------------------------------------------------------------------------

/// Looks up `keys` in the store at `path`.
///
/// Returns one `(key, value)` entry per distinct input key — `None`
/// when the key is absent — grouped by ascending bucket and ascending
/// key within a bucket. Keys wider than the key field cannot have been
/// stored and are reported absent without being searched.
///
/// An empty `keys` returns an empty result without opening the store.
pub fn fetch<K>(path: &Path, layout: Layout, keys: &[K]) -> Result<Vec<(String, Option<Vec<u8>>)>, StoreError>
where
    K: AsRef<str>,
{
    let by_bucket = partition_queries(layout, keys);
    if by_bucket.is_empty() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut header = HeaderTable::read_from(&file)?;
    header.validate(file_len, layout.record_size())?;

    let mut reader = BlockReader::new(file, HEADER_SIZE as u64);
    let mut results = Vec::with_capacity(by_bucket.values().map(Vec::len).sum());
    let mut found = 0usize;

    for (&bucket, queries) in &by_bucket {
        let (start, count) = header.resolve(bucket);

        let needles: Vec<&[u8]> = queries.iter().filter_map(|q| q.padded.as_deref()).collect();
        let probes = {
            let mut view = RunView {
                reader: &mut reader,
                start,
                count,
                layout,
            };
            multi_search(&mut view, &needles)?
        };

        let mut next = 0;
        for query in queries {
            let value = match &query.padded {
                None => None,
                Some(_) => {
                    let probe = probes[next];
                    next += 1;
                    match probe {
                        Ok(at) => {
                            let bytes = reader.read_field(
                                start as usize + at,
                                layout.record_size(),
                                layout.key_len(),
                                layout.value_len(),
                            )?;
                            found += 1;
                            Some(bytes.to_vec())
                        }
                        Err(_) => None,
                    }
                }
            };
            results.push((query.key.clone(), value));
        }
    }

    info!(
        found,
        queried = results.len(),
        path = %path.display(),
        "Fetched from store"
    );
    Ok(results)
}
