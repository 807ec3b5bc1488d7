#[cfg(test)]
mod tests {
    use crate::bucket::{BUCKET_COUNT, INITIALS_LEN, bucket_of};

    #[test]
    fn test_path_key_takes_byte_after_each_slash() {
        // Initials: 's' (after 1st '/'), 'd', 'r', then 'e' topped up
        // from the tail. Low nibbles 3, 4, 2, 5 fold to 0x3425.
        assert_eq!(bucket_of("usr/share/doc/readme"), 0x3425);
    }

    #[test]
    fn test_slashless_key_takes_leading_bytes() {
        // 'f', 'i', 'r', 'e' → nibbles 6, 9, 2, 5.
        assert_eq!(bucket_of("firefox"), 0x6925);
    }

    #[test]
    fn test_short_key_folds_fewer_nibbles() {
        assert_eq!(bucket_of("a"), 0x1);
        assert_eq!(bucket_of("usr"), 0x532);
        assert_eq!(bucket_of("a/b"), 0x2);
    }

    #[test]
    fn test_empty_key_lands_in_bucket_zero() {
        assert_eq!(bucket_of(""), 0);
    }

    #[test]
    fn test_trailing_slash_yields_no_initial() {
        // A trailing '/' has no byte after it, so the first pass collects
        // nothing and the top-up folds the leading bytes, slash included.
        assert_eq!(bucket_of("usr/"), 0x532F);
        assert_eq!(bucket_of("lib/"), 0xC92F);
    }

    #[test]
    fn test_initials_capped_at_four_separators() {
        // Five separators, but only the first four post-slash bytes
        // ('b', 'c', 'd', 'e') are folded.
        assert_eq!(bucket_of("a/b/c/d/e/f"), 0x2345);
        assert_eq!(bucket_of("a/b/c/d/e/f"), bucket_of("a/b/c/d/e/zzz"));
    }

    #[test]
    fn test_sibling_paths_spread_across_buckets() {
        // Final path component differs only in its first byte; with two
        // initials collected ('b' and that byte) every distinct low
        // nibble lands in a distinct bucket.
        let mut seen: Vec<usize> = (b'a'..=b'p')
            .map(|c| bucket_of(&format!("usr/bin/{}", c as char)))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn test_every_key_stays_in_range() {
        let keys = [
            "",
            "/",
            "////",
            "a",
            "etc/spike/config",
            "usr/share/man/man1/spike.1.gz",
            "var/lib/spikes/installed/firefox-128.0",
            "usr/share/doc/\u{65e5}\u{672c}\u{8a9e}",
        ];
        for key in keys {
            let id = bucket_of(key);
            assert!(id < BUCKET_COUNT, "{key:?} mapped to {id}");
        }
    }

    #[test]
    fn test_bucket_count_matches_initials_len() {
        assert_eq!(BUCKET_COUNT, 16usize.pow(INITIALS_LEN as u32));
    }
}
