//! Peer messaging and the synchronization protocol state machine.
//!
//! This crate is transport-agnostic: it defines the canonical messages
//! peers exchange and the pure handler that advances a node's state, while
//! delivery is left to whatever carries [`messages::AddressedMessage`]
//! envelopes between mailboxes.

pub mod messages;
pub mod protocol;
