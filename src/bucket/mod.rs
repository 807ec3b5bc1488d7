//! Bucket Derivation Module
//!
//! Maps a key string to one of [`BUCKET_COUNT`] buckets. A bucket is the
//! unit the store partitions its body by: the header holds one record
//! counter per bucket, and lookups binary-search only the records of the
//! queried key's bucket instead of the whole file.
//!
//! ## Derivation rule
//!
//! Up to [`INITIALS_LEN`] *initial bytes* are collected from the key:
//!
//! 1. the byte immediately following each `/`, left to right (a trailing
//!    `/` contributes nothing — there is no byte after it);
//! 2. if fewer than [`INITIALS_LEN`] were collected, the key's remaining
//!    bytes after the last collected initial (from the key's start when
//!    no initial was collected), until enough initials exist or the key
//!    ends.
//!
//! The low 4 bits of each initial are folded left-to-right:
//! `id = (id << 4) | (byte & 0x0F)`. With at most four nibbles the result
//! is always below `16^4 = 65536`. Keys shorter than four initials simply
//! fold fewer nibbles; the empty key lands in bucket 0.
//!
//! Keys are dominated by installed file paths (`usr/share/...`), so the
//! per-segment initial bytes spread sibling paths across buckets while
//! keeping the rule total for scroll identifiers and other slash-less
//! keys.
//!
//! # Guarantees
//!
//! - **Pure and total** — no I/O, no failure path, any `&str` input.
//! - **Deterministic** — the same key bytes always give the same bucket,
//!   which is what keeps builder, reader, and compactor in agreement.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Number of initial bytes (one hex nibble each) folded into a bucket id.
pub const INITIALS_LEN: usize = 4;

/// Total number of buckets: `16 ^ INITIALS_LEN`.
pub const BUCKET_COUNT: usize = 1 << (INITIALS_LEN * 4);

// ------------------------------------------------------------------------------------------------
// Derivation
// ------------------------------------------------------------------------------------------------

/// Returns the bucket id for `key`, always in `[0, BUCKET_COUNT)`.
pub fn bucket_of(key: &str) -> usize {
    let bytes = key.as_bytes();
    let mut initials = [0u8; INITIALS_LEN];
    let mut taken = 0;

    // Pass 1: the byte after each separator.
    let mut resume = 0;
    let mut i = 0;
    while i + 1 < bytes.len() && taken < INITIALS_LEN {
        if bytes[i] == b'/' {
            initials[taken] = bytes[i + 1];
            taken += 1;
            resume = i + 2;
        }
        i += 1;
    }

    // Pass 2: top up from the bytes after the last initial.
    let mut j = resume;
    while taken < INITIALS_LEN && j < bytes.len() {
        initials[taken] = bytes[j];
        taken += 1;
        j += 1;
    }

    let mut id = 0usize;
    for &byte in &initials[..taken] {
        id = (id << 4) | usize::from(byte & 0x0F);
    }
    id
}
