//! Ferrocoin Core Library
//!
//! Fundamental blockchain data structures and the deterministic state
//! engine: hashing, the merkle forest, transactions, the balance ledger,
//! blocks, the fork-aware chain store and the proof-of-work search.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod genesis;
pub mod ledger;
pub mod merkle;
pub mod pow;
pub mod transaction;

pub use error::{Error, Result};

/// SHA-256 digest identifying a block, transaction or merkle node.
///
/// The empty hash (zero bytes) is a sentinel meaning "no predecessor": the
/// genesis block's previous hash, a coinbase input's outpoint and the
/// `Null` merkle node all carry it. Every other value is a 32-byte digest.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(Vec<u8>);

impl Hash {
    /// The "no predecessor" sentinel.
    pub fn empty() -> Self {
        Hash(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0))
    }
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().to_vec())
}

/// Encodes an integer as a 32-byte big-endian value, the fixed-width form
/// used in every hash preimage.
pub fn be_bytes_32(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Opaque peer identifier used to address messages.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Address(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Address(id.to_owned())
    }
}

/// Identity of the local node: the address peers reach it at and the
/// public key its coinbase rewards pay out to.
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub node_id: Address,
    pub public_key: Vec<u8>,
}

impl NodeContext {
    pub fn new(node_id: Address, public_key: Vec<u8>) -> Self {
        NodeContext { node_id, public_key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_parts_matches_single_update() {
        let whole = sha256_parts(&[b"abcdef"]);
        let split = sha256_parts(&[b"abc", b"def"]);
        assert_eq!(whole, split);
        assert_eq!(whole.as_bytes().len(), 32);
    }

    #[test]
    fn be_bytes_32_pads_on_the_left() {
        let encoded = be_bytes_32(0x0102);
        assert_eq!(&encoded[..30], &[0u8; 30]);
        assert_eq!(&encoded[30..], &[0x01, 0x02]);
    }

    #[test]
    fn empty_hash_is_the_sentinel() {
        assert!(Hash::empty().is_empty());
        assert_eq!(Hash::empty().as_bytes(), b"");
    }
}
