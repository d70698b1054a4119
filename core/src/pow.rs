//! Proof-of-work search.
//!
//! Difficulty counts leading bytes of the block hash that must equal ASCII
//! `'0'` (0x30) — not zero bytes and not nibbles. Interop depends on this
//! byte-wise comparison, so it is preserved exactly.
//!
//! All functions are pure and stateless so they can run on any thread.

use crate::block::{OpenBlockHeader, SealedBlockHeader};
use crate::{be_bytes_32, Hash};
use sha2::Digest;
use tracing::{debug, info};

/// Nonces scanned between progress reports.
const REPORTING_INTERVAL: u64 = 1_000_000;

/// Returns `true` if `hash` starts with `difficulty` ASCII-zero bytes.
pub fn hash_meets_difficulty(hash: &Hash, difficulty: usize) -> bool {
    let bytes = hash.as_bytes();
    bytes.len() >= difficulty && bytes[..difficulty].iter().all(|&b| b == b'0')
}

/// Scans `max_tries` nonces from `starting_nonce` for one that seals
/// `open_block_header` at `difficulty`. Returns `None` when the range is
/// exhausted; callers restart from the next nonce.
pub fn find_block(
    open_block_header: &OpenBlockHeader,
    difficulty: usize,
    starting_nonce: u64,
    max_tries: u64,
) -> Option<SealedBlockHeader> {
    debug_assert!(difficulty >= 1, "difficulty must be at least one byte");
    let prefix = open_block_header.prefix_hasher();
    let end = starting_nonce.saturating_add(max_tries);
    for (i, nonce) in (starting_nonce..end).enumerate() {
        let mut hasher = prefix.clone();
        hasher.update(be_bytes_32(nonce));
        let block_hash = Hash::from_bytes(hasher.finalize().to_vec());
        if hash_meets_difficulty(&block_hash, difficulty) {
            info!(%block_hash, nonce, "found block");
            return Some(SealedBlockHeader {
                transaction_tree_hash: open_block_header.transaction_tree_hash.clone(),
                previous_block_hash: open_block_header.previous_block_hash.clone(),
                nonce,
                block_hash,
            });
        }
        if i > 0 && i as u64 % REPORTING_INTERVAL == 0 {
            debug!(tried = i, "still searching");
        }
    }
    debug!(
        difficulty,
        starting_nonce, max_tries, "exhausted nonce range without a block"
    );
    None
}
