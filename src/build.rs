use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::hash::{combine_hashes, hash_block};
use crate::node::{self, NodeId};
use crate::partition::{partition_file, BlockMap};
use crate::store::HashStore;

/// Everything one tree build needs, passed explicitly to the orchestrator.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source: PathBuf,
    /// Number of data blocks / leaf nodes. Must be a power of two.
    pub leaf_count: usize,
    pub blocks_dir: PathBuf,
    /// Worker threads in the pool; 0 means one per available CPU.
    pub workers: usize,
}

impl BuildConfig {
    pub fn new(
        source: impl Into<PathBuf>,
        leaf_count: usize,
        blocks_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            leaf_count,
            blocks_dir: blocks_dir.into(),
            workers: 0,
        }
    }
}

/// State shared by the worker pool for one build.
struct Shared {
    store: Arc<HashStore>,
    blocks: BlockMap,
    leaf_count: usize,
    /// Unfinished children per internal node (ids `0..n-1`), initialized
    /// to 2. A node is enqueued the moment its counter reaches zero, which
    /// is the fork-join ordering edge: both child digests are stored before
    /// the parent can be claimed.
    pending: Vec<AtomicU8>,
    aborted: AtomicBool,
    first_error: Mutex<Option<Error>>,
    task_tx: Sender<Option<NodeId>>,
    pool_size: usize,
}

impl Shared {
    /// Records the first failure and poisons the queue so every worker stops
    /// claiming nodes instead of waiting on children that will never finish.
    fn abort(&self, err: Error) {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.aborted.store(true, Ordering::Release);
        self.shutdown();
    }

    /// One poison pill per worker; delivered after any still-queued tasks.
    fn shutdown(&self) {
        for _ in 0..self.pool_size {
            let _ = self.task_tx.send(None);
        }
    }
}

/// Computes and stores the digest for one ready node.
fn run_node(shared: &Shared, id: NodeId) -> Result<()> {
    let digest = if node::is_leaf(id, shared.leaf_count) {
        let block = shared
            .blocks
            .read_block(node::block_index(id, shared.leaf_count))?;
        hash_block(&block)
    } else {
        let left = node::left_child(id);
        let right = node::right_child(id);
        let l = shared.store.get(left).ok_or(Error::UnreadyChild {
            parent: id,
            child: left,
        })?;
        let r = shared.store.get(right).ok_or(Error::UnreadyChild {
            parent: id,
            child: right,
        })?;
        combine_hashes(&l, &r)
    };
    shared.store.put(id, digest)?;
    debug!("node {} finished", id);
    Ok(())
}

fn worker_loop(shared: &Shared, task_rx: &Receiver<Option<NodeId>>) {
    while let Ok(Some(id)) = task_rx.recv() {
        if shared.aborted.load(Ordering::Acquire) {
            // Drain leftover tasks until the poison pills arrive.
            continue;
        }
        match run_node(shared, id) {
            Ok(()) => {
                if id == 0 {
                    // Root stored: the whole tree is done.
                    shared.shutdown();
                } else {
                    let parent = node::parent(id);
                    if shared.pending[parent].fetch_sub(1, Ordering::AcqRel) == 1 {
                        let _ = shared.task_tx.send(Some(parent));
                    }
                }
            }
            Err(err) => {
                warn!("node {} failed: {}", id, err);
                shared.abort(err.at_node(id));
            }
        }
    }
}

/// Hashes an already partitioned file bottom-up on a bounded worker pool.
///
/// All leaves are ready immediately; an internal node becomes ready once both
/// children have stored their digests. This preserves the fork-join
/// dependency order of the tree without spawning one task per node.
pub fn hash_tree(blocks: &BlockMap, workers: usize) -> Result<HashStore> {
    let leaf_count = blocks.block_count();
    if leaf_count == 0 || !leaf_count.is_power_of_two() {
        return Err(Error::Validation(format!(
            "leaf count {} is not a power of two",
            leaf_count
        )));
    }
    let total = node::node_count(leaf_count);

    let pool_size = if workers == 0 { num_cpus::get() } else { workers };
    let pool_size = pool_size.clamp(1, total);

    let mut pending = Vec::with_capacity(leaf_count - 1);
    for _ in 0..leaf_count - 1 {
        pending.push(AtomicU8::new(2));
    }

    let store = Arc::new(HashStore::with_capacity(total));
    let (task_tx, task_rx) = unbounded();
    let shared = Arc::new(Shared {
        store: Arc::clone(&store),
        blocks: blocks.clone(),
        leaf_count,
        pending,
        aborted: AtomicBool::new(false),
        first_error: Mutex::new(None),
        task_tx: task_tx.clone(),
        pool_size,
    });

    for id in node::leaf_ids(leaf_count) {
        let _ = task_tx.send(Some(id));
    }

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(pool_size);
    for i in 0..pool_size {
        let worker_shared = Arc::clone(&shared);
        let task_rx = task_rx.clone();
        let spawned = thread::Builder::new()
            .name(format!("merkle-worker-{}", i))
            .spawn(move || worker_loop(&worker_shared, &task_rx));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                shared.abort(Error::Spawn(e));
                break;
            }
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    if let Some(err) = shared.first_error.lock().unwrap().take() {
        return Err(err);
    }

    drop(shared);
    drop(task_tx);
    let store = Arc::try_unwrap(store).unwrap_or_else(|arc| (*arc).clone());
    debug_assert_eq!(store.len(), total);

    info!(
        "Merkle tree complete: {} nodes over {} blocks",
        total, leaf_count
    );
    Ok(store)
}

/// Drives a whole build: validates and partitions the source, then hashes the
/// tree. On success the returned store holds exactly `2N-1` digests keyed
/// `0..2N-2`.
pub fn build_tree(config: &BuildConfig) -> Result<HashStore> {
    info!(
        "Building Merkle tree over {} with {} leaves",
        config.source.display(),
        config.leaf_count
    );
    let blocks = partition_file(&config.source, config.leaf_count, &config.blocks_dir)?;
    hash_tree(&blocks, config.workers)
}
