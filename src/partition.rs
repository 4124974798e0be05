use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::info;

use crate::error::{Error, Result};

/// Smallest input the partitioner accepts, in bytes.
pub const MIN_FILE_SIZE: u64 = 128;
/// Largest input (128 MiB).
pub const MAX_FILE_SIZE: u64 = 134_217_728;

/// Locations and lengths of the persisted block files from one partition run.
/// Leaf workers consume blocks by index through this.
#[derive(Debug, Clone)]
pub struct BlockMap {
    dir: PathBuf,
    lengths: Vec<u64>,
}

impl BlockMap {
    pub fn block_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn block_len(&self, index: usize) -> u64 {
        self.lengths[index]
    }

    pub fn block_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.bin", index))
    }

    /// Reads block `index` in full. A block file that went missing or came
    /// back short aborts the build; there is no recovery that would not
    /// corrupt the root commitment.
    pub fn read_block(&self, index: usize) -> Result<Vec<u8>> {
        let path = self.block_path(index);
        let data = fs::read(&path).map_err(|e| Error::io(path.display().to_string(), e))?;
        if data.len() as u64 != self.lengths[index] {
            let short = io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, found {}", self.lengths[index], data.len()),
            );
            return Err(Error::io(path.display().to_string(), short));
        }
        Ok(data)
    }
}

/// Splits `source` into `leaf_count` contiguous block files under
/// `blocks_dir`, named `<index>.bin`.
///
/// Blocks `0..n-2` get `size / n` bytes each; the last block also takes the
/// remainder, so block lengths always sum to the exact file size.
pub fn partition_file(source: &Path, leaf_count: usize, blocks_dir: &Path) -> Result<BlockMap> {
    if leaf_count == 0 {
        return Err(Error::Validation("leaf count must be at least 1".into()));
    }
    if !leaf_count.is_power_of_two() {
        return Err(Error::Validation(format!(
            "leaf count {} is not a power of two",
            leaf_count
        )));
    }

    let file = File::open(source).map_err(|e| Error::io(source.display().to_string(), e))?;
    let size = file
        .metadata()
        .map_err(|e| Error::io(source.display().to_string(), e))?
        .len();

    if size < MIN_FILE_SIZE || size > MAX_FILE_SIZE {
        return Err(Error::Validation(format!(
            "file size {} outside supported range [{}, {}]",
            size, MIN_FILE_SIZE, MAX_FILE_SIZE
        )));
    }
    if leaf_count as u64 > size {
        return Err(Error::Validation(format!(
            "cannot split {} bytes into {} blocks of at least 1 byte",
            size, leaf_count
        )));
    }

    let mmap =
        unsafe { Mmap::map(&file) }.map_err(|e| Error::io(source.display().to_string(), e))?;

    fs::create_dir_all(blocks_dir).map_err(|e| Error::io(blocks_dir.display().to_string(), e))?;

    let base = size / leaf_count as u64;
    let mut lengths = Vec::with_capacity(leaf_count);
    let mut offset = 0usize;
    for i in 0..leaf_count {
        let len = if i == leaf_count - 1 {
            base + size % leaf_count as u64
        } else {
            base
        };
        let len = len as usize;

        let path = blocks_dir.join(format!("{}.bin", i));
        let mut block_file =
            File::create(&path).map_err(|e| Error::io(path.display().to_string(), e))?;
        block_file
            .write_all(&mmap[offset..offset + len])
            .map_err(|e| Error::io(path.display().to_string(), e))?;

        lengths.push(len as u64);
        offset += len;
    }

    info!(
        "Partitioned {} bytes into {} blocks under {}",
        size,
        leaf_count,
        blocks_dir.display()
    );

    Ok(BlockMap {
        dir: blocks_dir.to_path_buf(),
        lengths,
    })
}
