#[cfg(test)]
mod tests {
    use crate::blockio::BlockReader;
    use std::fs::File;
    use tempfile::TempDir;

    /// Writes `len` bytes where the byte at offset `i` is `i % 251`, so
    /// any field's expected content is computable from its position.
    fn scratch_file(len: usize) -> (TempDir, File) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("body.bin");
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();
        let file = File::open(&path).unwrap();
        (tmp, file)
    }

    fn expected(at: u64, len: usize) -> Vec<u8> {
        (at..at + len as u64).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_reads_fields_at_computed_positions() {
        let (_tmp, file) = scratch_file(4096);
        let mut reader = BlockReader::with_block_size(file, 0, 64);

        // stride 10, key field [0, 6), value field [6, 10)
        for record in [0usize, 1, 7, 100, 350] {
            let at = record as u64 * 10;
            assert_eq!(reader.read_field(record, 10, 0, 6).unwrap(), expected(at, 6));
            assert_eq!(
                reader.read_field(record, 10, 6, 4).unwrap(),
                expected(at + 6, 4)
            );
        }
    }

    #[test]
    fn test_base_offset_shifts_record_zero() {
        let (_tmp, file) = scratch_file(4096);
        let mut reader = BlockReader::with_block_size(file, 100, 16);

        assert_eq!(reader.read_field(0, 16, 0, 8).unwrap(), expected(100, 8));
        assert_eq!(reader.read_field(3, 16, 4, 8).unwrap(), expected(152, 8));
    }

    #[test]
    fn test_nearby_reads_share_one_window() {
        let (_tmp, file) = scratch_file(4096);
        let mut reader = BlockReader::with_block_size(file, 0, 64);

        // Records 0..=8 (stride 7) all end within the first 64-byte block.
        for record in 0..=8 {
            reader.read_field(record, 7, 0, 7).unwrap();
        }
        assert_eq!(reader.refills(), 1);

        // Record 9 spans [63, 70) and forces a second refill.
        reader.read_field(9, 7, 0, 7).unwrap();
        assert_eq!(reader.refills(), 2);
    }

    #[test]
    fn test_window_repositions_backwards() {
        let (_tmp, file) = scratch_file(4096);
        let mut reader = BlockReader::with_block_size(file, 0, 16);

        assert_eq!(reader.read_field(10, 8, 0, 8).unwrap(), expected(80, 8));
        assert_eq!(reader.read_field(0, 8, 0, 8).unwrap(), expected(0, 8));
        assert_eq!(reader.refills(), 2);
    }

    #[test]
    fn test_reads_are_position_pure() {
        let (_tmp, file) = scratch_file(64 * 1024);
        let mut reader = BlockReader::with_block_size(file, 0, 256);

        let first = reader.read_field(2, 32, 0, 32).unwrap().to_vec();
        // Force the window far away, then come back.
        reader.read_field(1500, 32, 0, 32).unwrap();
        let again = reader.read_field(2, 32, 0, 32).unwrap().to_vec();

        assert_eq!(first, again);
        assert_eq!(first, expected(64, 32));
    }

    #[test]
    fn test_probed_block_size_is_positive() {
        let (_tmp, file) = scratch_file(128);
        let reader = BlockReader::new(file, 0);
        assert!(reader.block_size() > 0);
    }
}
