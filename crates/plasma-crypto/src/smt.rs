//! # Sparse Merkle Commitment Tree
//!
//! A fixed-depth binary Merkle tree over the full key space, used to commit
//! one side-ledger block's transfers. Each level consumes one bit of the
//! key, most-significant first; a leaf holds a 32-byte value, and the
//! all-zero value denotes an absent unit.
//!
//! ## Algorithm
//!
//! - Leaf node hash: `keccak256(value)`.
//! - Interior node hash: `keccak256(left ‖ right)`.
//! - Nodes live in a hash-addressed database; an empty subtree at every
//!   level is precomputed once, so an empty tree stores one branch of
//!   repeated self-concatenating hashes of the zero value.
//!
//! The root after any sequence of `set` calls depends only on the final
//! key→value mapping, never on call order.
//!
//! ## Security Invariant
//!
//! Keys are exactly `depth / 8` bytes; a key of any other length is a shape
//! error, rejected before any state is touched. A truncated or padded key
//! would address a different unit's slot.

use std::collections::HashMap;

use thiserror::Error;

use plasma_core::{keccak256, keccak256_concat, Hash256};

/// Errors from commitment-tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The requested depth cannot index whole-byte keys.
    #[error("tree depth must be a positive multiple of 8 up to 256, got {bits}")]
    UnsupportedDepth {
        /// The rejected depth in bits.
        bits: usize,
    },

    /// A key had the wrong length for this tree's depth.
    #[error("key must be {expected} bytes for this tree, got {got}")]
    KeyLength {
        /// Required key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        got: usize,
    },

    /// The node database is missing a referenced node.
    ///
    /// Indicates external corruption of the backing store; never produced
    /// by the tree's own operations.
    #[error("node database is missing a referenced node")]
    MissingNode,
}

/// Returns the key bit for tree level `level` (0 = just below the root).
fn key_bit(key: &[u8], level: usize) -> bool {
    (key[level / 8] >> (7 - level % 8)) & 1 == 1
}

/// A fixed-depth sparse Merkle tree.
///
/// One instance commits one side-ledger block. The block builder mutates it
/// until publication; archived instances are immutable and serve proof
/// requests only.
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    depth: usize,
    root_hash: Hash256,
    /// Node hash → node bytes: 64 bytes (left ‖ right) for interior nodes,
    /// 32 bytes for leaf values.
    db: HashMap<Hash256, Vec<u8>>,
    /// Empty-subtree hashes in root→leaf order; `empty_hashes[depth - 1]`
    /// is the hash of the zero leaf.
    empty_hashes: Vec<Hash256>,
}

impl SparseMerkleTree {
    /// Create an empty tree of the given depth in bits.
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        if depth == 0 || depth > 256 || depth % 8 != 0 {
            return Err(TreeError::UnsupportedDepth { bits: depth });
        }

        // Build the empty-subtree ladder leaf→root, then flip.
        let mut rung = keccak256(Hash256::ZERO.as_bytes());
        let mut empty_hashes = vec![rung];
        for _ in 0..depth - 1 {
            rung = keccak256_concat(&rung, &rung);
            empty_hashes.push(rung);
        }
        empty_hashes.reverse();

        let root_hash = keccak256_concat(&empty_hashes[0], &empty_hashes[0]);

        let mut db = HashMap::new();
        let mut pair = Vec::with_capacity(64);
        pair.extend_from_slice(empty_hashes[0].as_bytes());
        pair.extend_from_slice(empty_hashes[0].as_bytes());
        db.insert(root_hash, pair);
        for i in 0..depth - 1 {
            let mut pair = Vec::with_capacity(64);
            pair.extend_from_slice(empty_hashes[i + 1].as_bytes());
            pair.extend_from_slice(empty_hashes[i + 1].as_bytes());
            db.insert(empty_hashes[i], pair);
        }
        db.insert(empty_hashes[depth - 1], Hash256::ZERO.as_bytes().to_vec());

        Ok(Self {
            depth,
            root_hash,
            db,
            empty_hashes,
        })
    }

    /// The tree depth in bits.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The required key length in bytes.
    pub fn key_len(&self) -> usize {
        self.depth / 8
    }

    /// The current root hash.
    pub fn root_hash(&self) -> Hash256 {
        self.root_hash
    }

    /// The root hash of an empty tree at this depth — a fixed constant.
    pub fn empty_root(&self) -> Hash256 {
        keccak256_concat(&self.empty_hashes[0], &self.empty_hashes[0])
    }

    fn check_key(&self, key: &[u8]) -> Result<(), TreeError> {
        if key.len() != self.key_len() {
            return Err(TreeError::KeyLength {
                expected: self.key_len(),
                got: key.len(),
            });
        }
        Ok(())
    }

    /// Walk root→leaf, returning the leaf value and the sibling branch in
    /// root→leaf order.
    fn walk(&self, key: &[u8]) -> Result<(Hash256, Vec<Hash256>), TreeError> {
        self.check_key(key)?;
        let mut branch = Vec::with_capacity(self.depth);
        let mut node_hash = self.root_hash;

        for level in 0..self.depth {
            let node = self.db.get(&node_hash).ok_or(TreeError::MissingNode)?;
            if node.len() != 64 {
                return Err(TreeError::MissingNode);
            }
            let left = hash_from_slice(&node[..32]);
            let right = hash_from_slice(&node[32..]);
            if key_bit(key, level) {
                branch.push(left);
                node_hash = right;
            } else {
                branch.push(right);
                node_hash = left;
            }
        }

        let leaf = self.db.get(&node_hash).ok_or(TreeError::MissingNode)?;
        if leaf.len() != 32 {
            return Err(TreeError::MissingNode);
        }
        Ok((hash_from_slice(leaf), branch))
    }

    /// Return the stored leaf value, or the zero value if never set.
    pub fn get(&self, key: &[u8]) -> Result<Hash256, TreeError> {
        Ok(self.walk(key)?.0)
    }

    /// Return the inclusion proof for `key`: the sibling hash at every
    /// level, in root→leaf order.
    pub fn branch(&self, key: &[u8]) -> Result<Vec<Hash256>, TreeError> {
        Ok(self.walk(key)?.1)
    }

    /// Whether a non-zero value is stored under `key`.
    pub fn exists(&self, key: &[u8]) -> Result<bool, TreeError> {
        Ok(!self.get(key)?.is_zero())
    }

    /// Store `value` under `key`, rehashing the path to the root.
    ///
    /// Reuses the fetched sibling branch, so one `set` is a single
    /// root→leaf walk plus `depth` hashes. Returns the updated node hashes
    /// in root→leaf order (the new root is [`root_hash()`](Self::root_hash)).
    pub fn set(&mut self, key: &[u8], value: Hash256) -> Result<Vec<Hash256>, TreeError> {
        let branch = self.branch(key)?;

        let mut node: Vec<u8> = value.as_bytes().to_vec();
        let mut updates = Vec::with_capacity(self.depth);

        // branch is in root→leaf order; rebuild from the leaf up.
        for (level, sibling) in branch.iter().enumerate().rev() {
            let node_hash = keccak256(&node);
            updates.push(node_hash);
            self.db.insert(node_hash, node);

            let mut next = Vec::with_capacity(64);
            if key_bit(key, level) {
                next.extend_from_slice(sibling.as_bytes());
                next.extend_from_slice(node_hash.as_bytes());
            } else {
                next.extend_from_slice(node_hash.as_bytes());
                next.extend_from_slice(sibling.as_bytes());
            }
            node = next;
        }

        self.root_hash = keccak256(&node);
        self.db.insert(self.root_hash, node);

        updates.reverse();
        Ok(updates)
    }

    /// Remove `key` — defined as storing the zero value.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TreeError> {
        self.set(key, Hash256::ZERO)?;
        Ok(())
    }
}

fn hash_from_slice(slice: &[u8]) -> Hash256 {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(slice);
    Hash256::from_bytes(bytes)
}

/// Verify an inclusion proof against a claimed root.
///
/// Recomputes the root from the leaf value and the sibling branch
/// (root→leaf order, as produced by [`SparseMerkleTree::branch`]) along the
/// key's bit path. This is the check the dispute engine runs on submitted
/// evidence; the tree itself never calls it.
///
/// Returns `false` for any mismatch, including a key whose length does not
/// match the branch — malformed proofs are never an error, just not proof.
pub fn verify_inclusion(key: &[u8], value: &Hash256, branch: &[Hash256], root: &Hash256) -> bool {
    if branch.is_empty() || branch.len() % 8 != 0 || key.len() != branch.len() / 8 {
        return false;
    }

    let mut node_hash = keccak256(value.as_bytes());
    for (level, sibling) in branch.iter().enumerate().rev() {
        node_hash = if key_bit(key, level) {
            keccak256_concat(sibling, &node_hash)
        } else {
            keccak256_concat(&node_hash, sibling)
        };
    }
    node_hash == *root
}
