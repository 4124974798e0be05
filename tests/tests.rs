use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use tempfile::tempdir;

use merkle_file_tree::build::{build_tree, hash_tree, BuildConfig};
use merkle_file_tree::error::Error;
use merkle_file_tree::hash::{combine_hashes, hash_block};
use merkle_file_tree::partition::partition_file;
use merkle_file_tree::store::HashStore;

fn write_random_file(dir: &Path, name: &str, size: usize) -> (PathBuf, Vec<u8>) {
    let mut data = vec![0u8; size];
    rand::thread_rng().fill(&mut data[..]);
    let path = dir.join(name);
    fs::write(&path, &data).unwrap();
    (path, data)
}

#[cfg(test)]
mod partition_tests {
    use super::*;

    #[test]
    fn test_block_lengths_and_contents() {
        let dir = tempdir().unwrap();
        let (source, data) = write_random_file(dir.path(), "input.bin", 1003);
        let blocks_dir = dir.path().join("blocks");

        let blocks = partition_file(&source, 8, &blocks_dir).unwrap();
        assert_eq!(blocks.block_count(), 8);

        // 1003 / 8 = 125, remainder 3 lands on the last block.
        for i in 0..7 {
            assert_eq!(blocks.block_len(i), 125);
        }
        assert_eq!(blocks.block_len(7), 128);

        // Blocks are contiguous, in order, and exhaustive.
        let mut rebuilt = Vec::new();
        for i in 0..8 {
            rebuilt.extend_from_slice(&blocks.read_block(i).unwrap());
        }
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn test_rejects_too_small_file() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "tiny.bin", 64);
        let err = partition_file(&source, 2, &dir.path().join("blocks")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("huge.bin");
        // Sparse file just over the 128 MiB cap; size is checked before any read.
        let file = fs::File::create(&source).unwrap();
        file.set_len(134_217_729).unwrap();
        let err = partition_file(&source, 2, &dir.path().join("blocks")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_more_blocks_than_bytes() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 128);
        let err = partition_file(&source, 256, &dir.path().join("blocks")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 512);
        let err = partition_file(&source, 3, &dir.path().join("blocks")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn test_write_once_per_key() {
        let store = HashStore::new();
        store.put(5, "aa".repeat(32)).unwrap();
        let err = store.put(5, "bb".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::DuplicateWrite(5)));
        // The original value survives the rejected write.
        assert_eq!(store.get(5).unwrap(), "aa".repeat(32));
    }

    #[test]
    fn test_persist_artifacts() {
        let dir = tempdir().unwrap();
        let store = HashStore::new();
        store.put(0, "cc".repeat(32)).unwrap();
        store.put(1, "dd".repeat(32)).unwrap();
        store.put(2, "ee".repeat(32)).unwrap();
        store.persist(dir.path()).unwrap();

        let read = fs::read_to_string(dir.path().join("1.out")).unwrap();
        assert_eq!(read, "dd".repeat(32));
    }
}

#[cfg(test)]
mod build_tests {
    use super::*;

    fn build(source: &Path, n: usize, dir: &Path) -> HashStore {
        let config = BuildConfig::new(source, n, dir.join("blocks"));
        build_tree(&config).unwrap()
    }

    #[test]
    fn test_single_leaf_root_is_file_hash() {
        let dir = tempdir().unwrap();
        let (source, data) = write_random_file(dir.path(), "input.bin", 200);
        let store = build(&source, 1, dir.path());
        assert_eq!(store.len(), 1);
        assert_eq!(store.root().unwrap(), hash_block(&data));
    }

    #[test]
    fn test_eight_leaf_tree_shape() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 4096);
        let blocks_dir = dir.path().join("blocks");
        let blocks = partition_file(&source, 8, &blocks_dir).unwrap();
        let store = hash_tree(&blocks, 4).unwrap();

        // 15 entries, ids 0..14, every one present.
        assert_eq!(store.len(), 15);
        for id in 0..15 {
            assert!(store.get(id).is_some(), "missing node {}", id);
        }

        // Leaves 7..14 hash blocks 0..7 respectively.
        for i in 0..8 {
            let block = blocks.read_block(i).unwrap();
            assert_eq!(store.get(7 + i).unwrap(), hash_block(&block));
        }

        // Internal nodes combine their children left-then-right.
        let n1 = store.get(1).unwrap();
        let n2 = store.get(2).unwrap();
        assert_eq!(store.root().unwrap(), combine_hashes(&n1, &n2));
        let n7 = store.get(7).unwrap();
        let n8 = store.get(8).unwrap();
        assert_eq!(store.get(3).unwrap(), combine_hashes(&n7, &n8));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 9000);

        let first = build(&source, 16, &dir.path().join("a"));
        let second = build(&source, 16, &dir.path().join("b"));
        assert_eq!(first.root().unwrap(), second.root().unwrap());
    }

    #[test]
    fn test_pool_size_does_not_change_result() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 2048);
        let blocks = partition_file(&source, 8, &dir.path().join("blocks")).unwrap();

        let serial = hash_tree(&blocks, 1).unwrap();
        let pooled = hash_tree(&blocks, 8).unwrap();
        assert_eq!(serial.root().unwrap(), pooled.root().unwrap());
    }

    #[test]
    fn test_single_byte_flip_changes_root() {
        let dir = tempdir().unwrap();
        let (source, mut data) = write_random_file(dir.path(), "input.bin", 1024);
        let before = build(&source, 8, &dir.path().join("a"));

        data[777] ^= 0x01;
        fs::write(&source, &data).unwrap();
        let after = build(&source, 8, &dir.path().join("b"));

        assert_ne!(before.root().unwrap(), after.root().unwrap());
    }

    #[test]
    fn test_combine_is_order_sensitive() {
        let a = hash_block(b"left");
        let b = hash_block(b"right");
        assert_ne!(combine_hashes(&a, &b), combine_hashes(&b, &a));
    }

    #[test]
    fn test_missing_block_aborts_whole_build() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 2048);
        let blocks = partition_file(&source, 8, &dir.path().join("blocks")).unwrap();

        // Injected leaf failure: block 3 belongs to leaf node 10.
        fs::remove_file(blocks.block_path(3)).unwrap();

        let err = hash_tree(&blocks, 4).unwrap_err();
        match err {
            Error::Build { node, .. } => assert_eq!(node, 10),
            other => panic!("expected build failure, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_block_aborts_whole_build() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 2048);
        let blocks = partition_file(&source, 4, &dir.path().join("blocks")).unwrap();

        let victim = blocks.block_path(1);
        let full = fs::read(&victim).unwrap();
        fs::write(&victim, &full[..full.len() - 1]).unwrap();

        let err = hash_tree(&blocks, 2).unwrap_err();
        assert!(matches!(err, Error::Build { .. }));
    }
}

#[cfg(test)]
mod visualize_tests {
    use super::*;
    use merkle_file_tree::visualize::render_tree;

    #[test]
    fn test_renders_every_node() {
        let dir = tempdir().unwrap();
        let (source, _) = write_random_file(dir.path(), "input.bin", 512);
        let config = BuildConfig::new(&source, 4, dir.path().join("blocks"));
        let store = build_tree(&config).unwrap();

        let mut out = Vec::new();
        render_tree(&store, 4, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 7);
        assert!(text.contains("(block 0)"));
        assert!(text.contains("(block 3)"));
        assert!(text.starts_with("0: "));
    }
}
