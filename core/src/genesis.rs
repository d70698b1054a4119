//! The fixed genesis block every chain is rooted at.

use crate::block::{OpenBlockHeader, SealedBlock};
use crate::chain::ChainNode;
use crate::ledger::Ledger;
use crate::merkle::MerkleNode;
use crate::Hash;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Nonce baked into the genesis header. Genesis is never re-mined, so it
/// does not have to meet any difficulty target.
pub const GENESIS_NONCE: u64 = 99;

static GENESIS_BLOCK: Lazy<SealedBlock> = Lazy::new(|| {
    let header = OpenBlockHeader {
        transaction_tree_hash: Hash::empty(),
        previous_block_hash: Hash::empty(),
    };
    let block = SealedBlock {
        header: header.seal(GENESIS_NONCE),
        transaction_tree: MerkleNode::Null,
    };
    debug_assert!(block.validate_hashes());
    block
});

/// The sealed genesis block: empty transaction tree, no predecessor.
pub fn genesis_block() -> SealedBlock {
    GENESIS_BLOCK.clone()
}

/// The chain node every lookup starts from: height 1, empty ledger.
pub fn genesis_chain() -> Arc<ChainNode> {
    Arc::new(ChainNode {
        parent: None,
        height: 1,
        block: genesis_block(),
        ledger: Ledger::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hashes_validate() {
        let block = genesis_block();
        assert!(block.validate_hashes());
        assert!(block.header.previous_block_hash.is_empty());
        assert!(block.header.transaction_tree_hash.is_empty());
        assert_eq!(block.header.nonce, GENESIS_NONCE);
    }

    #[test]
    fn genesis_chain_starts_at_height_one() {
        let chain = genesis_chain();
        assert_eq!(chain.height, 1);
        assert!(chain.parent.is_none());
        assert!(chain.ledger.balances.is_empty());
    }
}
