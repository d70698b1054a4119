//! The messages peers exchange, and their canonical wire encoding.

use ferrocoin_core::block::SealedBlock;
use ferrocoin_core::transaction::Transaction;
use ferrocoin_core::{Address, Hash};
use serde::{Deserialize, Serialize};

/// Everything one peer can say to another.
///
/// A closed tagged union: adding a variant forces every handler to account
/// for it at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Handshake opener announcing the sender's protocol version.
    Version { version: String },
    /// Handshake reply.
    VersionAck,
    /// Ask a peer for the inventory reachable from one of `header_hashes`.
    GetBlocks {
        header_hashes: Vec<Hash>,
        stopping_hash: Option<Hash>,
    },
    /// Block hashes advertised in response to `GetBlocks`.
    Inventory { header_hashes: Vec<Hash> },
    /// Request the full blocks behind advertised hashes.
    GetData { objects_requested: Vec<Hash> },
    /// One full block.
    Block { block: SealedBlock },
    /// A candidate transaction for the mempool.
    Transaction { transaction: Transaction },
    /// Ask a peer for the addresses it knows.
    GetAddr,
    /// Peer addresses, volunteered or in response to `GetAddr`.
    Addr { addresses: Vec<Address> },
}

impl Message {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Version { .. } => "version",
            Message::VersionAck => "version_ack",
            Message::GetBlocks { .. } => "get_blocks",
            Message::Inventory { .. } => "inventory",
            Message::GetData { .. } => "get_data",
            Message::Block { .. } => "block",
            Message::Transaction { .. } => "transaction",
            Message::GetAddr => "get_addr",
            Message::Addr { .. } => "addr",
        }
    }
}

/// A message routed between two peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressedMessage {
    pub sender: Address,
    pub recipient: Address,
    pub message: Message,
}

/// Canonical wire encoding of an envelope.
pub fn encode(envelope: &AddressedMessage) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(envelope)
}

/// Decodes a wire envelope; hashes inside any block are recomputed from the
/// shipped payloads rather than trusted.
pub fn decode(bytes: &[u8]) -> Result<AddressedMessage, bincode::Error> {
    bincode::deserialize(bytes)
}
