//! In-process multi-node simulation.
//!
//! Each node runs on its own thread with bounded mailboxes. A central
//! dispatcher owns every inbox and copies each outbound envelope into the
//! recipient's queue, exactly the role a network would play. Peers start in
//! a ring: node *i* knows node *i + 1*, and the Addr exchange fills in the
//! rest.

use crate::run::{run_node, Mailbox};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ferrocoin_core::chain::{StartupState, State};
use ferrocoin_core::config::Config;
use ferrocoin_core::{Address, NodeContext};
use ferrocoin_network::messages::AddressedMessage;
use ferrocoin_wallet as wallet;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-node mailbox capacity. Queues this deep never fill in practice; a
/// full one means a node stopped draining and the message is dropped.
const MAILBOX_CAPACITY: usize = 1024;

/// How long the dispatcher idles before re-checking for shutdown.
const DISPATCH_POLL: Duration = Duration::from_millis(100);

/// Runs one node per id until each reaches `config.target_height`, routing
/// messages between them, and returns every node's final state. A fresh
/// keypair is generated for every node.
///
/// A single node is started already synced and simply mines; multiple
/// nodes start peering and synchronize first.
pub fn simulate(node_ids: &[Address], config: &Config) -> HashMap<Address, State> {
    let nodes = node_ids
        .iter()
        .map(|node_id| (node_id.clone(), wallet::generate_keypair()))
        .collect();
    simulate_with_keys(nodes, config)
}

/// Like [`simulate`], with caller-provided keypairs.
pub fn simulate_with_keys(
    nodes: Vec<(Address, wallet::Keypair)>,
    config: &Config,
) -> HashMap<Address, State> {
    let node_ids: Vec<Address> = nodes.iter().map(|(node_id, _)| node_id.clone()).collect();
    let startup_state = if node_ids.len() > 1 {
        StartupState::Peering
    } else {
        StartupState::Synced
    };

    let (outbox_sender, outbox) = bounded::<AddressedMessage>(MAILBOX_CAPACITY);
    let mut inboxes: HashMap<Address, Sender<AddressedMessage>> = HashMap::new();
    let mut result_receivers: Vec<(Address, Receiver<State>)> = Vec::new();
    let mut handles = Vec::new();

    for (i, (node_id, keypair)) in nodes.into_iter().enumerate() {
        let (inbox_sender, inbox) = bounded(MAILBOX_CAPACITY);
        let (result_sender, results) = bounded(1);
        inboxes.insert(node_id.clone(), inbox_sender);
        result_receivers.push((node_id.clone(), results));

        let ctx = NodeContext::new(node_id.clone(), wallet::public_key_bytes(&keypair));
        let init_peers: HashSet<Address> = if node_ids.len() > 1 {
            HashSet::from([node_ids[(i + 1) % node_ids.len()].clone()])
        } else {
            HashSet::new()
        };
        let mailbox = Mailbox {
            inbox,
            outbox: outbox_sender.clone(),
            results: result_sender,
        };
        let config = config.clone();
        handles.push(thread::spawn(move || {
            run_node(ctx, config, init_peers, startup_state, mailbox)
        }));
    }
    // Only node threads hold outbox senders now: the channel disconnects
    // once every node has finished.
    drop(outbox_sender);

    loop {
        match outbox.recv_timeout(DISPATCH_POLL) {
            Ok(envelope) => match inboxes.get(&envelope.recipient) {
                Some(inbox) => {
                    if inbox.try_send(envelope).is_err() {
                        debug!("dropped envelope for a stopped or saturated node");
                    }
                }
                None => {
                    debug!(recipient = %envelope.recipient, "dropped envelope for unknown recipient")
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let mut finals = HashMap::new();
    for (node_id, results) in result_receivers {
        match results.recv_timeout(Duration::from_secs(5)) {
            Ok(state) => {
                finals.insert(node_id, state);
            }
            Err(_) => warn!(node = %node_id, "node reported no final state"),
        }
    }
    for handle in handles {
        let _ = handle.join();
    }
    finals
}
