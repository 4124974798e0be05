use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::node::NodeId;

/// Write-once mapping from node id to finalized hex digest.
///
/// Every node id has exactly one producing worker, so the only cross-thread
/// contract is insert-if-absent on first write. Visibility of a child's value
/// to its parent comes from the scheduler hand-off, not from locking here.
#[derive(Debug, Default, Clone)]
pub struct HashStore {
    map: DashMap<NodeId, String>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            map: DashMap::with_capacity(nodes),
        }
    }

    /// Stores `digest` under `id`. A second write to the same id means the
    /// tree shape or scheduling went wrong; it is reported, never ignored.
    pub fn put(&self, id: NodeId, digest: String) -> Result<()> {
        match self.map.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateWrite(id)),
            Entry::Vacant(slot) => {
                slot.insert(digest);
                Ok(())
            }
        }
    }

    /// Finalized digest for `id`, if its worker has completed.
    pub fn get(&self, id: NodeId) -> Option<String> {
        self.map.get(&id).map(|v| v.value().clone())
    }

    /// Digest of the root node, if the build reached it.
    pub fn root(&self) -> Option<String> {
        self.get(0)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Writes one `<id>.out` hex artifact per node into `dir`. Called after
    /// the build finishes; the build itself never reads these back.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
        for entry in self.map.iter() {
            let path = dir.join(format!("{}.out", entry.key()));
            let mut file =
                File::create(&path).map_err(|e| Error::io(path.display().to_string(), e))?;
            file.write_all(entry.value().as_bytes())
                .map_err(|e| Error::io(path.display().to_string(), e))?;
        }
        Ok(())
    }
}
