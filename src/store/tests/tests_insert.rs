#[cfg(test)]
mod tests {
    use crate::{Layout, Store, StoreError};
    use tempfile::TempDir;
    use tracing::Level;
    use tracing_subscriber::fmt::Subscriber;

    fn init_tracing() {
        let _ = Subscriber::builder()
            .with_max_level(Level::TRACE)
            .try_init();
    }

    fn scratch() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("owners.db"), Layout::new(16, 4).unwrap());
        (tmp, store)
    }

    #[test]
    fn test_insert_adds_new_keys() {
        init_tracing();
        let (_tmp, store) = scratch();

        store
            .build(&[("usr/bin/a", *b"AAAA"), ("var/log/b", *b"BBBB")])
            .unwrap();
        store
            .insert(&[("etc/c", *b"CCCC"), ("opt/d", *b"DDDD")])
            .unwrap();

        let results = store
            .fetch(&["usr/bin/a", "var/log/b", "etc/c", "opt/d"])
            .unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|(_, value)| value.is_some()));
    }

    #[test]
    fn test_insert_extends_an_existing_run() {
        init_tracing();
        let (_tmp, store) = scratch();

        // pkga/pkgb/pkgc share all four initials, so the new record lands
        // in the middle of an existing run.
        store
            .build(&[("usr/bin/pkga", *b"AAAA"), ("usr/bin/pkgc", *b"CCCC")])
            .unwrap();
        store.insert(&[("usr/bin/pkgb", *b"BBBB")]).unwrap();

        let results = store
            .fetch(&["usr/bin/pkga", "usr/bin/pkgb", "usr/bin/pkgc"])
            .unwrap();
        let values: Vec<_> = results.iter().map(|(_, v)| v.as_deref()).collect();
        assert_eq!(
            values,
            [Some(&b"AAAA"[..]), Some(&b"BBBB"[..]), Some(&b"CCCC"[..])]
        );
    }

    #[test]
    fn test_insert_overwrites_existing_key() {
        init_tracing();
        let (_tmp, store) = scratch();

        store.build(&[("usr/bin/a", *b"old-")]).unwrap();
        store.insert(&[("usr/bin/a", *b"new-")]).unwrap();

        let results = store.fetch(&["usr/bin/a"]).unwrap();
        assert_eq!(results[0].1.as_deref(), Some(&b"new-"[..]));
    }

    #[test]
    fn test_insert_empty_batch_preserves_bytes() {
        init_tracing();
        let (_tmp, store) = scratch();

        store
            .build(&[("usr/bin/a", *b"AAAA"), ("var/log/b", *b"BBBB")])
            .unwrap();
        let before = std::fs::read(store.path()).unwrap();

        store.insert::<&str, &[u8]>(&[]).unwrap();

        let after = std::fs::read(store.path()).unwrap();
        assert_eq!(before, after, "rewrite of unchanged content is canonical");
    }

    #[test]
    fn test_insert_into_missing_store_is_io_error() {
        init_tracing();
        let (_tmp, store) = scratch();

        let err = store.insert(&[("usr/bin/a", *b"AAAA")]).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_insert_rejects_long_key_before_touching_the_file() {
        init_tracing();
        let (_tmp, store) = scratch();

        store.build(&[("usr/bin/a", *b"AAAA")]).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let long = "wider-than-the-sixteen-byte-field";
        let err = store.insert(&[(long, *b"XXXX")]).unwrap_err();
        assert!(matches!(err, StoreError::KeyTooLong { max: 16, .. }));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_insert_rejects_wrong_width_value() {
        init_tracing();
        let (_tmp, store) = scratch();

        store.build(&[("usr/bin/a", *b"AAAA")]).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let err = store.insert(&[("etc/b", &b"too-wide"[..])]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ValueLength {
                expected: 4,
                actual: 8
            }
        ));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_insert_into_truncated_file_is_corrupt_header() {
        init_tracing();
        let (_tmp, store) = scratch();

        // Shorter than the counter table can ever be.
        std::fs::write(store.path(), [0u8; 128]).unwrap();

        let err = store.insert(&[("usr/bin/a", *b"AAAA")]).unwrap_err();
        assert!(matches!(err, StoreError::CorruptHeader(_)));
    }
}
