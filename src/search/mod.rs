//! Batched Binary Search Module
//!
//! Lookup machinery shared by fetch and remove. Both operations resolve
//! many keys against one sorted record run, so the search is built around
//! batches instead of independent probes.
//!
//! ## Design
//!
//! - [`SortedView`] abstracts "indexable run of sorted byte fields". The
//!   store backs it with a block-buffered file reader; tests back it with
//!   plain vectors. Field access takes `&mut self` because a file-backed
//!   view refills its cache while serving a field.
//! - [`binary_search`] probes one needle against an inclusive `[lo, hi]`
//!   index range and returns a [`Probe`].
//! - [`multi_search`] resolves a whole sorted batch: it searches the
//!   median query first, then recurses (via an explicit work stack) into
//!   the left and right query halves with the view range narrowed by the
//!   median's outcome. Total field comparisons are O(log n + m) for m
//!   queries against n records, against O(m log n) for independent probes.
//!
//! ## Contract
//!
//! `multi_search` requires `queries` sorted ascending and duplicate-free;
//! the narrowing argument is unsound otherwise and results are undefined
//! (garbage probes, never a panic or an error). Callers that accept
//! arbitrary input sort and dedupe first.
//!
//! # Guarantees
//!
//! - Results align index-for-index with `queries`.
//! - Every query is probed exactly once; sub-ranges never overlap.
//! - No recursion. Stack depth is O(log m) frames on the heap.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Imports
// ------------------------------------------------------------------------------------------------

use std::cmp::Ordering;
use std::io;

// ------------------------------------------------------------------------------------------------
// Types
// ------------------------------------------------------------------------------------------------

/// Outcome of probing one needle.
///
/// `Ok(index)` — the needle sits at `index`. `Err(insertion)` — absent;
/// inserting at `insertion` would keep the run sorted. Both arms carry the
/// position, so a miss still narrows neighbouring searches.
pub type Probe = Result<usize, usize>;

/// An indexable run of byte fields in ascending order.
pub trait SortedView {
    /// Number of fields in the run.
    fn len(&self) -> usize;

    /// Whether the run holds no fields.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the field at `index`. `index` is in `[0, len())`; a
    /// file-backed view may fail with the underlying I/O error.
    fn field(&mut self, index: usize) -> io::Result<&[u8]>;
}

// ------------------------------------------------------------------------------------------------
// Search
// ------------------------------------------------------------------------------------------------

/// Probes `needle` against the inclusive index range `[lo, hi]` of `view`.
///
/// Bounds are `i64` so an exhausted range (`hi = lo - 1`, including
/// `hi = -1` on an empty view) needs no special casing. An empty range
/// reads nothing and misses at `lo`.
pub fn binary_search<V>(view: &mut V, needle: &[u8], mut lo: i64, mut hi: i64) -> io::Result<Probe>
where
    V: SortedView + ?Sized,
{
    while lo <= hi {
        let mid = (lo + hi) >> 1;
        match view.field(mid as usize)?.cmp(needle) {
            Ordering::Equal => return Ok(Ok(mid as usize)),
            Ordering::Greater => hi = mid - 1,
            Ordering::Less => lo = mid + 1,
        }
    }
    Ok(Err(lo as usize))
}

/// Resolves every query of a sorted, duplicate-free batch against `view`.
///
/// Returns one [`Probe`] per query, same order as `queries`.
pub fn multi_search<V, Q>(view: &mut V, queries: &[Q]) -> io::Result<Vec<Probe>>
where
    V: SortedView + ?Sized,
    Q: AsRef<[u8]>,
{
    let mut probes: Vec<Probe> = vec![Err(0); queries.len()];
    if queries.is_empty() {
        return Ok(probes);
    }

    // Work stack of (query range, view range), both inclusive. Query
    // ranges are pushed only when non-empty; view ranges may be empty,
    // which binary_search resolves without touching the view.
    let mut stack: Vec<(usize, usize, i64, i64)> = Vec::new();
    stack.push((0, queries.len() - 1, 0, view.len() as i64 - 1));

    while let Some((qlo, qhi, lo, hi)) = stack.pop() {
        let qmid = qlo + ((qhi - qlo) >> 1);
        let probe = binary_search(view, queries[qmid].as_ref(), lo, hi)?;
        probes[qmid] = probe;

        // Queries left of the median are strictly smaller, so they sit
        // strictly left of a hit and left of a miss's insertion point.
        // Queries right of the median mirror that, except a missed
        // median's insertion point itself stays reachable.
        let (left_hi, right_lo) = match probe {
            Ok(at) => (at as i64 - 1, at as i64 + 1),
            Err(insertion) => (insertion as i64 - 1, insertion as i64),
        };

        if qmid > qlo {
            stack.push((qlo, qmid - 1, lo, left_hi));
        }
        if qmid < qhi {
            stack.push((qmid + 1, qhi, right_lo, hi));
        }
    }

    Ok(probes)
}
