use std::ops::Range;

/// Heap index of a tree node: node 0 is the root and node `id`'s children are
/// `2*id+1` and `2*id+2`. For `n` leaves (n a power of two) the ids
/// `0..2n-1` address every node exactly once, leaves last.
pub type NodeId = usize;

/// Total node count of a complete binary tree with `leaf_count` leaves.
pub fn node_count(leaf_count: usize) -> usize {
    2 * leaf_count - 1
}

/// Leaves occupy the id range `[n-1, 2n-2]`. With a single leaf, node 0 is
/// both root and leaf.
pub fn is_leaf(id: NodeId, leaf_count: usize) -> bool {
    id >= leaf_count - 1
}

/// Block index hashed by leaf `id`.
pub fn block_index(id: NodeId, leaf_count: usize) -> usize {
    id - (leaf_count - 1)
}

pub fn left_child(id: NodeId) -> NodeId {
    2 * id + 1
}

pub fn right_child(id: NodeId) -> NodeId {
    2 * id + 2
}

pub fn parent(id: NodeId) -> NodeId {
    (id - 1) / 2
}

/// Ids of all leaf nodes, in block order.
pub fn leaf_ids(leaf_count: usize) -> Range<NodeId> {
    leaf_count - 1..2 * leaf_count - 1
}
