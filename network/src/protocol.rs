//! The message-driven synchronization state machine.
//!
//! [`listen`] is a pure function from (state, message) to a replacement
//! state plus outbound traffic; it never fails. A fresh node walks
//! Peering → Connecting → Inventory → Data → Synced; messages arriving in
//! the wrong startup state are logged and ignored, never fatal.

use crate::messages::{AddressedMessage, Message};
use ferrocoin_core::chain::{try_add_block, try_add_transaction, ChainNode, StartupState, State};
use ferrocoin_core::{Address, Hash, NodeContext};
use std::sync::Arc;
use tracing::{debug, info};

/// Longest inventory a single response will carry.
pub const MAX_INVENTORIES: usize = 500;

/// Outcome of handling one message.
#[derive(Debug, Default)]
pub struct ListenResult {
    /// Replacement state, when the message changed anything.
    pub new_state: Option<State>,
    /// Replies for the message's sender.
    pub responses: Vec<Message>,
    /// Messages for other recipients.
    pub addressed: Vec<AddressedMessage>,
}

/// Walks the parent chain from `head` looking for `header_hash`.
pub fn find_inventory(head: &Arc<ChainNode>, header_hash: &Hash) -> Option<Arc<ChainNode>> {
    let mut current = Some(head);
    while let Some(node) = current {
        if node.block.header.block_hash == *header_hash {
            return Some(Arc::clone(node));
        }
        current = node.parent.as_ref();
    }
    None
}

/// Collects block hashes walking from `init_head` toward genesis. The
/// starting block's hash is included, the stopping block's is not, and at
/// most [`MAX_INVENTORIES`] hashes are returned.
pub fn accumulate_inventories(
    init_head: &Arc<ChainNode>,
    stopping_hash: Option<&Hash>,
) -> Vec<Hash> {
    let mut inventories = Vec::new();
    let mut current = Some(init_head);
    while let Some(node) = current {
        if inventories.len() >= MAX_INVENTORIES {
            break;
        }
        if Some(&node.block.header.block_hash) == stopping_hash {
            break;
        }
        inventories.push(node.block.header.block_hash.clone());
        current = node.parent.as_ref();
    }
    inventories
}

fn log_wrong_state(kind: &str, actual: StartupState) {
    info!(kind, state = ?actual, "ignoring message in current startup state");
}

/// Applies one message to the node's state.
pub fn listen(ctx: &NodeContext, state: &State, message: &Message) -> ListenResult {
    match message {
        Message::Version { version } => {
            debug!(%version, "peer announced version");
            ListenResult {
                responses: vec![Message::VersionAck],
                ..Default::default()
            }
        }

        Message::VersionAck => {
            if state.startup_state != StartupState::Connecting {
                log_wrong_state(message.kind(), state.startup_state);
                return ListenResult::default();
            }
            ListenResult {
                new_state: Some(state.clone().with_startup(StartupState::Inventory)),
                responses: vec![
                    Message::GetBlocks {
                        header_hashes: vec![state.best_head.block.header.block_hash.clone()],
                        stopping_hash: None,
                    },
                    Message::GetAddr,
                ],
                ..Default::default()
            }
        }

        Message::GetBlocks {
            header_hashes,
            stopping_hash,
        } => {
            let shared = header_hashes
                .iter()
                .find_map(|hash| find_inventory(&state.best_head, hash));
            let Some(shared) = shared else {
                info!("failed to find a shared block");
                return ListenResult::default();
            };
            let header_hashes = accumulate_inventories(&shared, stopping_hash.as_ref());
            ListenResult {
                responses: vec![Message::Inventory { header_hashes }],
                ..Default::default()
            }
        }

        Message::Inventory { header_hashes } => {
            if state.startup_state != StartupState::Inventory {
                log_wrong_state(message.kind(), state.startup_state);
                return ListenResult::default();
            }
            let needed: Vec<Hash> = header_hashes
                .iter()
                .filter(|hash| !state.block_lookup.contains_key(*hash))
                .cloned()
                .collect();
            if needed.is_empty() {
                ListenResult {
                    new_state: Some(state.clone().with_startup(StartupState::Synced)),
                    ..Default::default()
                }
            } else {
                ListenResult {
                    new_state: Some(state.clone().with_startup(StartupState::Data)),
                    responses: vec![Message::GetData {
                        objects_requested: needed,
                    }],
                    ..Default::default()
                }
            }
        }

        Message::GetData { objects_requested } => {
            let responses = objects_requested
                .iter()
                .filter_map(|hash| state.block_lookup.get(hash))
                .map(|chain| Message::Block {
                    block: chain.block.clone(),
                })
                .collect();
            ListenResult {
                responses,
                ..Default::default()
            }
        }

        Message::Block { block } => {
            if state.block_lookup.contains_key(&block.header.block_hash) {
                debug!(block_hash = %block.header.block_hash, "block already in storage");
                return ListenResult::default();
            }
            ListenResult {
                new_state: Some(try_add_block(ctx, state, block.clone())),
                ..Default::default()
            }
        }

        Message::Transaction { transaction } => {
            let mempool = try_add_transaction(&state.mempool, transaction);
            let mut new_state = state.clone();
            new_state.mempool = mempool;
            ListenResult {
                new_state: Some(new_state),
                ..Default::default()
            }
        }

        Message::GetAddr => {
            let mut addresses: Vec<Address> = state.peers.iter().cloned().collect();
            addresses.sort();
            ListenResult {
                responses: vec![Message::Addr { addresses }],
                ..Default::default()
            }
        }

        Message::Addr { addresses } => {
            let new_peers: Vec<Address> = addresses
                .iter()
                .filter(|address| !state.peers.contains(*address) && **address != ctx.node_id)
                .cloned()
                .collect();
            if new_peers.is_empty() {
                return ListenResult::default();
            }
            let mut new_state = state.clone();
            new_state.peers.extend(new_peers.iter().cloned());
            debug!(peers = new_state.peers.len(), "learned new peers");
            let addressed = new_peers
                .into_iter()
                .map(|peer| AddressedMessage {
                    sender: ctx.node_id.clone(),
                    recipient: peer,
                    message: Message::GetAddr,
                })
                .collect();
            ListenResult {
                new_state: Some(new_state),
                addressed,
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
    use ferrocoin_core::block::{OpenBlockHeader, SealedBlock};
    use ferrocoin_core::ledger::update_ledger;
    use ferrocoin_core::merkle::MerkleNode;
    use ferrocoin_core::transaction::{
        make_reward_transaction, Transaction, TransactionInput, TransactionOutpoint,
        TransactionOutput,
    };
    use std::collections::HashSet;

    fn test_keypair(seed: u8) -> Keypair {
        let secret = SecretKey::from_bytes(&[seed; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn test_ctx(node_id: &str) -> NodeContext {
        let keypair = test_keypair(42);
        NodeContext::new(Address::new(node_id), keypair.public.as_bytes().to_vec())
    }

    fn empty_block(previous_block_hash: &Hash, nonce: u64) -> SealedBlock {
        let header = OpenBlockHeader {
            transaction_tree_hash: Hash::empty(),
            previous_block_hash: previous_block_hash.clone(),
        };
        SealedBlock {
            header: header.seal(nonce),
            transaction_tree: MerkleNode::Null,
        }
    }

    /// A state whose best chain is genesis plus `extra` empty blocks.
    fn state_with_chain(ctx: &NodeContext, startup: StartupState, extra: usize) -> State {
        let mut state = State::new(ctx, startup, HashSet::new());
        for nonce in 0..extra as u64 {
            let block = empty_block(&state.best_head.block.header.block_hash, 100 + nonce);
            state = try_add_block(ctx, &state, block);
        }
        state
    }

    #[test]
    fn version_is_acknowledged_in_any_state() {
        let ctx = test_ctx("a");
        for startup in [StartupState::Peering, StartupState::Synced] {
            let state = State::new(&ctx, startup, HashSet::new());
            let result = listen(
                &ctx,
                &state,
                &Message::Version {
                    version: "x".into(),
                },
            );
            assert_eq!(result.responses, vec![Message::VersionAck]);
            assert!(result.new_state.is_none());
        }
    }

    #[test]
    fn version_ack_starts_the_inventory_exchange() {
        let ctx = test_ctx("a");
        let state = State::new(&ctx, StartupState::Connecting, HashSet::new());
        let result = listen(&ctx, &state, &Message::VersionAck);
        assert_eq!(
            result.new_state.expect("state advances").startup_state,
            StartupState::Inventory
        );
        assert_eq!(
            result.responses,
            vec![
                Message::GetBlocks {
                    header_hashes: vec![state.best_head.block.header.block_hash.clone()],
                    stopping_hash: None,
                },
                Message::GetAddr,
            ]
        );
    }

    #[test]
    fn version_ack_outside_connecting_is_ignored() {
        let ctx = test_ctx("a");
        let state = State::new(&ctx, StartupState::Synced, HashSet::new());
        let result = listen(&ctx, &state, &Message::VersionAck);
        assert!(result.new_state.is_none());
        assert!(result.responses.is_empty());
    }

    #[test]
    fn get_blocks_answers_with_the_chain_below_the_shared_block() {
        let ctx = test_ctx("a");
        let state = state_with_chain(&ctx, StartupState::Synced, 3);

        // The requester's tip is our genesis: the response walks from there
        // toward genesis, so it carries just that hash.
        let genesis_hash = {
            let mut node = state.best_head.clone();
            while let Some(parent) = node.parent.clone() {
                node = parent;
            }
            node.block.header.block_hash.clone()
        };
        let result = listen(
            &ctx,
            &state,
            &Message::GetBlocks {
                header_hashes: vec![genesis_hash.clone()],
                stopping_hash: None,
            },
        );
        assert_eq!(
            result.responses,
            vec![Message::Inventory {
                header_hashes: vec![genesis_hash.clone()],
            }]
        );

        // Asking from our own tip walks the whole chain, newest first,
        // stopping before the stopping hash.
        let tip = state.best_head.block.header.block_hash.clone();
        let result = listen(
            &ctx,
            &state,
            &Message::GetBlocks {
                header_hashes: vec![tip.clone()],
                stopping_hash: Some(genesis_hash.clone()),
            },
        );
        match &result.responses[..] {
            [Message::Inventory { header_hashes }] => {
                assert_eq!(header_hashes.len(), 3);
                assert_eq!(header_hashes[0], tip);
                assert!(!header_hashes.contains(&genesis_hash));
            }
            other => panic!("unexpected responses: {other:?}"),
        }
    }

    #[test]
    fn get_blocks_with_no_shared_block_is_dropped() {
        let ctx = test_ctx("a");
        let state = state_with_chain(&ctx, StartupState::Synced, 1);
        let result = listen(
            &ctx,
            &state,
            &Message::GetBlocks {
                header_hashes: vec![Hash::from_bytes(vec![0xFF; 32])],
                stopping_hash: None,
            },
        );
        assert!(result.responses.is_empty());
        assert!(result.new_state.is_none());
    }

    #[test]
    fn known_inventory_means_synced() {
        let ctx = test_ctx("a");
        let state = State::new(&ctx, StartupState::Inventory, HashSet::new());
        let result = listen(
            &ctx,
            &state,
            &Message::Inventory {
                header_hashes: vec![state.best_head.block.header.block_hash.clone()],
            },
        );
        assert_eq!(
            result.new_state.expect("synced").startup_state,
            StartupState::Synced
        );
        assert!(result.responses.is_empty());
    }

    #[test]
    fn unknown_inventory_requests_the_data() {
        let ctx = test_ctx("a");
        let state = State::new(&ctx, StartupState::Inventory, HashSet::new());
        let missing = Hash::from_bytes(vec![0xAB; 32]);
        let result = listen(
            &ctx,
            &state,
            &Message::Inventory {
                header_hashes: vec![
                    missing.clone(),
                    state.best_head.block.header.block_hash.clone(),
                ],
            },
        );
        assert_eq!(
            result.new_state.expect("data").startup_state,
            StartupState::Data
        );
        assert_eq!(
            result.responses,
            vec![Message::GetData {
                objects_requested: vec![missing],
            }]
        );
    }

    #[test]
    fn get_data_serves_only_known_blocks() {
        let ctx = test_ctx("a");
        let state = state_with_chain(&ctx, StartupState::Synced, 1);
        let known = state.best_head.block.header.block_hash.clone();
        let result = listen(
            &ctx,
            &state,
            &Message::GetData {
                objects_requested: vec![known, Hash::from_bytes(vec![0xCD; 32])],
            },
        );
        assert_eq!(result.responses.len(), 1);
        match &result.responses[0] {
            Message::Block { block } => {
                assert_eq!(block.header.block_hash, state.best_head.block.header.block_hash)
            }
            other => panic!("unexpected response: {:?}", other.kind()),
        }
    }

    #[test]
    fn new_blocks_are_integrated_and_duplicates_dropped() {
        let ctx = test_ctx("a");
        let state = State::new(&ctx, StartupState::Synced, HashSet::new());
        let block = empty_block(&state.best_head.block.header.block_hash, 5);

        let result = listen(
            &ctx,
            &state,
            &Message::Block {
                block: block.clone(),
            },
        );
        let state = result.new_state.expect("block integrates");
        assert_eq!(state.best_head.height, 2);

        let result = listen(&ctx, &state, &Message::Block { block });
        assert!(result.new_state.is_none());
    }

    #[test]
    fn valid_transactions_enter_the_mempool_and_invalid_ones_do_not() {
        let ctx = test_ctx("a");
        let mut state = State::new(&ctx, StartupState::Synced, HashSet::new());

        // Give the local key a balance the mempool ledger can see.
        let keypair = test_keypair(42);
        let reward = make_reward_transaction(&ctx);
        state.mempool.ledger = update_ledger(&state.mempool.ledger, &reward).unwrap();

        let mut spend = Transaction {
            inputs: vec![TransactionInput {
                previous_transaction_outpoint: TransactionOutpoint {
                    previous_transaction_hash: reward.hash(),
                    index: 0,
                },
                signature: Vec::new(),
            }],
            outputs: vec![TransactionOutput {
                value: 10,
                recipient_public_key: vec![1, 2, 3],
            }],
        };
        let signature = keypair.sign(spend.hash_for_signature().as_bytes());
        spend.inputs[0].signature = signature.to_bytes().to_vec();

        let before = state.mempool.transactions.merge().hash();
        let result = listen(
            &ctx,
            &state,
            &Message::Transaction {
                transaction: spend.clone(),
            },
        );
        let accepted = result.new_state.expect("mempool updated");
        assert_ne!(accepted.mempool.transactions.merge().hash(), before);

        // A forged signature leaves the mempool as it was.
        let mut forged = spend;
        forged.outputs[0].value = 11;
        let result = listen(&ctx, &state, &Message::Transaction { transaction: forged });
        let rejected = result.new_state.expect("state replaced either way");
        assert_eq!(rejected.mempool.transactions.merge().hash(), before);
    }

    #[test]
    fn addr_exchange_learns_new_peers_and_greets_them() {
        let ctx = test_ctx("a");
        let state = State::new(
            &ctx,
            StartupState::Synced,
            HashSet::from([Address::new("b")]),
        );

        let result = listen(
            &ctx,
            &state,
            &Message::Addr {
                addresses: vec![Address::new("a"), Address::new("b"), Address::new("c")],
            },
        );
        let new_state = result.new_state.expect("peer learned");
        assert_eq!(new_state.peers.len(), 2);
        assert!(new_state.peers.contains(&Address::new("c")));

        // Only the genuinely new peer is greeted.
        assert_eq!(result.addressed.len(), 1);
        assert_eq!(result.addressed[0].recipient, Address::new("c"));
        assert_eq!(result.addressed[0].message, Message::GetAddr);

        // Nothing new: no state change, no traffic.
        let result = listen(
            &ctx,
            &new_state,
            &Message::Addr {
                addresses: vec![Address::new("b")],
            },
        );
        assert!(result.new_state.is_none());
        assert!(result.addressed.is_empty());
    }

    #[test]
    fn get_addr_reports_known_peers() {
        let ctx = test_ctx("a");
        let state = State::new(
            &ctx,
            StartupState::Synced,
            HashSet::from([Address::new("c"), Address::new("b")]),
        );
        let result = listen(&ctx, &state, &Message::GetAddr);
        assert_eq!(
            result.responses,
            vec![Message::Addr {
                addresses: vec![Address::new("b"), Address::new("c")],
            }]
        );
    }
}
