use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of a raw data block.
pub fn hash_block(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Parent digest: SHA-256 over the two children's hex digest strings
/// concatenated left-then-right with no separator. Swapping the children
/// yields a different digest, so the tree commits to block order.
pub fn combine_hashes(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}
