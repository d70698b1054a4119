//! Block headers and sealed blocks.
//!
//! A header is open while the nonce search is still running and sealed once
//! a nonce has fixed its hash. The block hash preimage is bit-exact for
//! interop: transaction-tree hash, previous block hash, then the nonce as a
//! 32-byte big-endian integer.

use crate::merkle::MerkleNode;
use crate::{be_bytes_32, Hash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Header of a block still searching for its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlockHeader {
    pub transaction_tree_hash: Hash,
    pub previous_block_hash: Hash,
}

impl OpenBlockHeader {
    /// A digest pre-loaded with everything but the nonce. The nonce search
    /// clones this once per candidate instead of re-absorbing the prefix.
    pub fn prefix_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.transaction_tree_hash.as_bytes());
        hasher.update(self.previous_block_hash.as_bytes());
        hasher
    }

    /// Block hash for one candidate nonce.
    pub fn hash(&self, nonce: u64) -> Hash {
        let mut hasher = self.prefix_hasher();
        hasher.update(be_bytes_32(nonce));
        Hash::from_bytes(hasher.finalize().to_vec())
    }

    /// Seals the header with `nonce`, fixing its block hash.
    pub fn seal(&self, nonce: u64) -> SealedBlockHeader {
        SealedBlockHeader {
            transaction_tree_hash: self.transaction_tree_hash.clone(),
            previous_block_hash: self.previous_block_hash.clone(),
            nonce,
            block_hash: self.hash(nonce),
        }
    }
}

/// Header whose nonce search has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlockHeader {
    pub transaction_tree_hash: Hash,
    pub previous_block_hash: Hash,
    pub nonce: u64,
    pub block_hash: Hash,
}

impl SealedBlockHeader {
    /// The open header this one was sealed from.
    pub fn open(&self) -> OpenBlockHeader {
        OpenBlockHeader {
            transaction_tree_hash: self.transaction_tree_hash.clone(),
            previous_block_hash: self.previous_block_hash.clone(),
        }
    }
}

/// Candidate block handed to the miner: the tree is fixed, the nonce open.
#[derive(Debug, Clone)]
pub struct OpenBlock {
    pub header: OpenBlockHeader,
    pub transaction_tree: MerkleNode,
}

/// A mined or received block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlock {
    pub header: SealedBlockHeader,
    pub transaction_tree: MerkleNode,
}

impl SealedBlock {
    /// Recomputes the transaction-tree hash and the block hash and checks
    /// both against the sealed header.
    pub fn validate_hashes(&self) -> bool {
        if self.transaction_tree.hash() != self.header.transaction_tree_hash {
            return false;
        }
        self.header.open().hash(self.header.nonce) == self.header.block_hash
    }
}
