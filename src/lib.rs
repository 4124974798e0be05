//! merkle_file_tree: Concurrent SHA-256 Merkle tree hasher for local files
//!
//! # Usage
//! See README.md for details and examples.

pub mod build;
pub mod error;
pub mod hash;
pub mod node;
pub mod partition;
pub mod store;
pub mod visualize;
