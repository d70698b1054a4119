//! The node's cooperative event loop.
//!
//! Each iteration drains at most one inbound envelope, advances the
//! protocol, and tends the miner: while the node is synced exactly one
//! worker runs, always on a candidate assembled from the current best head
//! and mempool. The loop ends once the best head reaches the configured
//! target height, at which point the final state is reported.

use crate::miner::MinerHandle;
use crossbeam_channel::{Receiver, Sender};
use ferrocoin_core::block::SealedBlock;
use ferrocoin_core::chain::{build_next_block, try_add_block, StartupState, State};
use ferrocoin_core::config::Config;
use ferrocoin_core::{Address, NodeContext};
use ferrocoin_network::messages::{AddressedMessage, Message};
use ferrocoin_network::protocol::listen;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, info_span};

/// How long one iteration waits on the inbox before tending the miner.
const INBOX_POLL: Duration = Duration::from_millis(150);

/// The node's channel endpoints.
pub struct Mailbox {
    pub inbox: Receiver<AddressedMessage>,
    pub outbox: Sender<AddressedMessage>,
    pub results: Sender<State>,
}

/// Runs one node to its target height and reports the final state.
pub fn run_node(
    ctx: NodeContext,
    config: Config,
    init_peers: HashSet<Address>,
    init_startup_state: StartupState,
    mailbox: Mailbox,
) {
    let span = info_span!("node", id = %ctx.node_id);
    let _enter = span.enter();

    let mut state = State::new(&ctx, init_startup_state, init_peers);
    let mut miner: Option<MinerHandle> = None;
    info!(
        target_height = config.target_height,
        difficulty = config.difficulty,
        peers = state.peers.len(),
        "node starting"
    );

    while state.best_head.height < config.target_height {
        if let Ok(envelope) = mailbox.inbox.recv_timeout(INBOX_POLL) {
            debug!(from = %envelope.sender, kind = envelope.message.kind(), "received");
            let result = listen(&ctx, &state, &envelope.message);
            if let Some(new_state) = result.new_state {
                state = new_state;
            }
            for response in result.responses {
                send(&mailbox, &ctx, envelope.sender.clone(), response);
            }
            for addressed in result.addressed {
                let _ = mailbox.outbox.send(addressed);
            }
        }

        if state.startup_state == StartupState::Peering {
            for peer in state.peers.clone() {
                send(
                    &mailbox,
                    &ctx,
                    peer,
                    Message::Version {
                        version: config.protocol_version.clone(),
                    },
                );
            }
            state = state.with_startup(StartupState::Connecting);
        }

        // A worker is only worth keeping while it targets the current best
        // head and the current mempool.
        if let Some(handle) = &miner {
            let stale = state.startup_state != StartupState::Synced
                || handle.candidate().header.previous_block_hash
                    != state.best_head.block.header.block_hash
                || handle.candidate().header.transaction_tree_hash
                    != state.mempool.transactions.merge().hash();
            if stale {
                debug!("cancelling stale mining worker");
                if let Some(handle) = miner.take() {
                    handle.terminate();
                }
            }
        }

        if state.startup_state == StartupState::Synced && miner.is_none() {
            let candidate = build_next_block(&state);
            miner = Some(MinerHandle::spawn(
                ctx.node_id.clone(),
                candidate,
                config.difficulty,
            ));
        }

        if let Some(sealed) = miner.as_ref().and_then(|handle| handle.try_result()) {
            if let Some(handle) = miner.take() {
                let candidate = handle.finish();
                let block = SealedBlock {
                    header: sealed,
                    transaction_tree: candidate.transaction_tree,
                };
                info!(block_hash = %block.header.block_hash, "integrating mined block");
                state = try_add_block(&ctx, &state, block.clone());
                for peer in state.peers.clone() {
                    send(
                        &mailbox,
                        &ctx,
                        peer,
                        Message::Block {
                            block: block.clone(),
                        },
                    );
                }
            }
        }
    }

    if let Some(handle) = miner.take() {
        handle.terminate();
    }
    info!(height = state.best_head.height, "target height reached");
    let _ = mailbox.results.send(state);
}

fn send(mailbox: &Mailbox, ctx: &NodeContext, recipient: Address, message: Message) {
    let envelope = AddressedMessage {
        sender: ctx.node_id.clone(),
        recipient,
        message,
    };
    // The dispatcher may already be gone during shutdown; lost messages are
    // acceptable there.
    let _ = mailbox.outbox.send(envelope);
}
