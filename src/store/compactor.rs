//! Store compactor — record removal by rewrite.
//!
//! Removal never punches holes: [`remove`] locates the doomed records
//! with the same batched search the reader uses, then streams the byte
//! ranges between them into a fresh file behind a patched counter
//! table. The result is a store with the surviving records exactly as
//! compact and ordered as a fresh build.
//!
//! A remove that matches nothing leaves the store file byte-identical —
//! no temporary, no rename, no timestamp churn.

use std::fs::{File, OpenOptions, rename};
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::StoreError;
use crate::blockio::BlockReader;
use crate::header::{HEADER_SIZE, HeaderTable};
use crate::search::multi_search;
use crate::store::{Layout, RunView, partition_queries};

// ------------------------------------------------------------------------------------------------
// Remove
// ------------------------------------------------------------------------------------------------

/// Removes `keys` from the store at `path` and rewrites it without
/// them.
///
/// Returns the distinct keys that were **not** present, grouped by
/// ascending bucket and ascending key within a bucket. Keys wider than
/// the key field cannot have been stored and land on that list without
/// being searched. An empty `keys` is a no-op that never opens the
/// store.
pub fn remove<K>(path: &Path, layout: Layout, keys: &[K]) -> Result<Vec<String>, StoreError>
where
    K: AsRef<str>,
{
    let by_bucket = partition_queries(layout, keys);
    let mut missing: Vec<String> = Vec::new();
    if by_bucket.is_empty() {
        return Ok(missing);
    }

    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut header = HeaderTable::read_from(&file)?;
    header.validate(file_len, layout.record_size())?;

    // Pass 1: locate every doomed record. Global record indexes come
    // out ascending because buckets and keys are visited in order.
    // Counter decrements wait until the pass is done — resolve() must
    // keep describing the file as it still is.
    let mut reader = BlockReader::new(file, HEADER_SIZE as u64);
    let mut doomed: Vec<u64> = Vec::new();
    let mut removed_per_bucket: Vec<(usize, u32)> = Vec::new();

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
        let mut removed_here = 0u32;
        for query in queries {
            match &query.padded {
                None => missing.push(query.key.clone()),
                Some(_) => {
                    let probe = probes[next];
                    next += 1;
                    match probe {
                        Ok(at) => {
                            doomed.push(start + at as u64);
                            removed_here += 1;
                        }
                        Err(_) => missing.push(query.key.clone()),
                    }
                }
            }
        }
        if removed_here > 0 {
            removed_per_bucket.push((bucket, removed_here));
        }
    }

    if doomed.is_empty() {
        debug!("No keys matched, leaving {} untouched", path.display());
        return Ok(missing);
    }

    let total_before = header.total_records() as usize;
    for &(bucket, removed) in &removed_per_bucket {
        header.decrement(bucket, removed);
    }

    // Pass 2: stream the gaps between doomed records into a fresh file
    // behind the decremented counter table.
    drop(reader);
    let source = File::open(path)?;
    let mmap = unsafe { Mmap::map(&source)? };
    let body = &mmap[HEADER_SIZE..];
    let record_size = layout.record_size();

    let tmp_path = path.with_extension("tmp");
    let mut out = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(&mut out);

    writer.write_all(&header.to_bytes())?;
    let mut cursor = 0usize;
    for &index in &doomed {
        let index = index as usize;
        if index > cursor {
            writer.write_all(&body[cursor * record_size..index * record_size])?;
        }
        cursor = index + 1;
    }
    if total_before > cursor {
        writer.write_all(&body[cursor * record_size..total_before * record_size])?;
    }

    writer.flush()?;
    drop(writer);
    out.sync_all()?;

    rename(&tmp_path, path)?;

    info!(
        removed = doomed.len(),
        not_found = missing.len(),
        remaining = header.total_records(),
        path = %path.display(),
        "Removed from store"
    );
    Ok(missing)
}
