//! Fork-aware chain store, mempool and the node's deterministic state.
//!
//! Blocks form a parent-linked tree rooted at genesis. Chain nodes are
//! shared and never mutated after insertion; every state transition builds
//! a new [`State`] and the old one is dropped.

use crate::block::{OpenBlock, OpenBlockHeader, SealedBlock};
use crate::genesis;
use crate::ledger::{update_ledger, validate_transactions, Ledger};
use crate::merkle::{MerkleForest, MerkleNode};
use crate::transaction::{make_reward_transaction, Transaction};
use crate::{Address, Hash, NodeContext};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One block in the tree of chains, with the ledger as it stood after the
/// block was applied.
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub parent: Option<Arc<ChainNode>>,
    pub height: u64,
    pub block: SealedBlock,
    pub ledger: Ledger,
}

/// Where the node stands in its synchronization handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Peering,
    Connecting,
    Inventory,
    Data,
    Synced,
}

/// Candidate transactions for the next mined block.
///
/// The first leaf is always this node's coinbase, raised to height 1 so
/// later appends never fold into it. `ledger` tracks the effect of the
/// queued spends on top of the best head's ledger; the coinbase itself is
/// only applied once the block is.
#[derive(Debug, Clone)]
pub struct Mempool {
    pub ledger: Ledger,
    pub transactions: MerkleForest,
}

impl Mempool {
    /// A mempool holding only `coinbase`, validating spends against
    /// `ledger`.
    pub fn with_coinbase(ledger: Ledger, coinbase: Transaction) -> Mempool {
        debug_assert!(coinbase.is_coinbase());
        Mempool {
            ledger,
            transactions: MerkleForest::from_tree(MerkleNode::leaf(coinbase, 1)),
        }
    }
}

/// The node's entire deterministic state.
#[derive(Debug, Clone)]
pub struct State {
    pub best_head: Arc<ChainNode>,
    pub block_lookup: HashMap<Hash, Arc<ChainNode>>,
    pub startup_state: StartupState,
    pub mempool: Mempool,
    /// Blocks whose parent has not arrived yet, keyed by their own hash.
    pub orphaned_blocks: HashMap<Hash, SealedBlock>,
    pub peers: HashSet<Address>,
}

impl State {
    /// Fresh state rooted at genesis, with a mempool holding this node's
    /// coinbase.
    pub fn new(ctx: &NodeContext, startup_state: StartupState, peers: HashSet<Address>) -> State {
        let head = genesis::genesis_chain();
        let mut block_lookup = HashMap::new();
        block_lookup.insert(head.block.header.block_hash.clone(), Arc::clone(&head));
        let mempool = Mempool::with_coinbase(head.ledger.clone(), make_reward_transaction(ctx));
        State {
            best_head: head,
            block_lookup,
            startup_state,
            mempool,
            orphaned_blocks: HashMap::new(),
            peers,
        }
    }

    pub fn with_startup(mut self, startup_state: StartupState) -> State {
        self.startup_state = startup_state;
        self
    }
}

/// Integrates `block` into the chain store, returning the new state.
///
/// A block whose parent is unknown is parked in the orphan pool. Hash or
/// transaction failures leave the state untouched. A block extending past
/// the current best head becomes the new head and the mempool is repruned
/// against its ledger; an equal height keeps the incumbent. Integrating a
/// block may give one orphan its parent, and that orphan is then
/// integrated the same way.
pub fn try_add_block(ctx: &NodeContext, state: &State, block: SealedBlock) -> State {
    let Some(parent) = state.block_lookup.get(&block.header.previous_block_hash) else {
        let mut orphaned_blocks = state.orphaned_blocks.clone();
        orphaned_blocks.insert(block.header.block_hash.clone(), block);
        return State {
            orphaned_blocks,
            ..state.clone()
        };
    };

    if !block.validate_hashes() {
        warn!("invalid hashes in block received");
        return state.clone();
    }

    let ledger = match validate_transactions(&parent.ledger, &block) {
        Ok(ledger) => ledger,
        Err(err) => {
            warn!(%err, "invalid transactions in block received");
            return state.clone();
        }
    };

    let chain = Arc::new(ChainNode {
        parent: Some(Arc::clone(parent)),
        height: parent.height + 1,
        block,
        ledger,
    });
    let block_hash = chain.block.header.block_hash.clone();

    let mut orphaned_blocks = state.orphaned_blocks.clone();
    let newly_parented = orphaned_blocks
        .iter()
        .find(|(_, orphan)| orphan.header.previous_block_hash == block_hash)
        .map(|(hash, _)| hash.clone())
        .and_then(|hash| orphaned_blocks.remove(&hash));

    let (best_head, mempool) = if chain.height > state.best_head.height {
        let mempool =
            prune_transactions(&state.mempool, &chain.ledger, make_reward_transaction(ctx));
        (Arc::clone(&chain), mempool)
    } else {
        (Arc::clone(&state.best_head), state.mempool.clone())
    };

    let mut block_lookup = state.block_lookup.clone();
    block_lookup.insert(block_hash, chain);

    let new_state = State {
        best_head,
        block_lookup,
        startup_state: state.startup_state,
        mempool,
        orphaned_blocks,
        peers: state.peers.clone(),
    };
    match newly_parented {
        Some(orphan) => try_add_block(ctx, &new_state, orphan),
        None => new_state,
    }
}

/// Appends `transaction` to the mempool if it validates against the
/// mempool's ledger; otherwise returns the mempool unchanged.
pub fn try_add_transaction(mempool: &Mempool, transaction: &Transaction) -> Mempool {
    match update_ledger(&mempool.ledger, transaction) {
        Ok(ledger) => Mempool {
            ledger,
            transactions: mempool.transactions.add(transaction.clone()),
        },
        Err(err) => {
            debug!(%err, "failed to add transaction to mempool");
            mempool.clone()
        }
    }
}

/// Rebuilds the mempool after the best head moved to `ledger`.
///
/// `coinbase` becomes the first leaf. The old mempool's transactions are
/// re-validated in DFS order; the ones already mined into the new chain or
/// no longer valid against it are silently dropped.
pub fn prune_transactions(
    old_mempool: &Mempool,
    ledger: &Ledger,
    coinbase: Transaction,
) -> Mempool {
    let mut mempool = Mempool::with_coinbase(ledger.clone(), coinbase);
    let merged = old_mempool.transactions.merge();
    for transaction in merged.transactions() {
        if transaction.is_coinbase()
            || ledger
                .previous_transactions
                .contains_key(&transaction.hash())
        {
            continue;
        }
        mempool = try_add_transaction(&mempool, transaction);
    }
    mempool
}

/// Assembles the candidate the miner should search: previous block is the
/// best head, transaction tree is the merged mempool forest.
pub fn build_next_block(state: &State) -> OpenBlock {
    let transaction_tree = state.mempool.transactions.merge();
    OpenBlock {
        header: OpenBlockHeader {
            transaction_tree_hash: transaction_tree.hash(),
            previous_block_hash: state.best_head.block.header.block_hash.clone(),
        },
        transaction_tree,
    }
}
