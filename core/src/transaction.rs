//! The transaction model: outpoints, inputs, outputs and the two digests
//! every transaction carries.
//!
//! Canonical bytes are fixed by the network: an outpoint is its previous
//! transaction hash followed by the output index as a 32-byte big-endian
//! integer; an input appends its signature; an output is its value as a
//! 32-byte big-endian integer followed by the recipient public key.

use crate::{be_bytes_32, Hash, NodeContext};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A reference to a specific output of a previous transaction.
///
/// A coinbase input carries the empty previous hash, marking that it spends
/// nothing and mints the block reward instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub previous_transaction_hash: Hash,
    pub index: u32,
}

impl TransactionOutpoint {
    fn absorb(&self, hasher: &mut Sha256) {
        hasher.update(self.previous_transaction_hash.as_bytes());
        hasher.update(be_bytes_32(u64::from(self.index)));
    }
}

/// Spends one outpoint. The signature covers the spending transaction's
/// [`Transaction::hash_for_signature`], so inputs commit to where the value
/// goes without covering themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_transaction_outpoint: TransactionOutpoint,
    pub signature: Vec<u8>,
}

impl TransactionInput {
    fn absorb(&self, hasher: &mut Sha256) {
        self.previous_transaction_outpoint.absorb(hasher);
        hasher.update(&self.signature);
    }
}

/// A newly created claim on value, credited to `recipient_public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub recipient_public_key: Vec<u8>,
}

impl TransactionOutput {
    fn absorb(&self, hasher: &mut Sha256) {
        hasher.update(be_bytes_32(self.value));
        hasher.update(&self.recipient_public_key);
    }
}

/// A transfer of value: inputs drain the referenced recipients' balances,
/// outputs credit new ones. Both sequences are ordered and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// A coinbase mints the block reward: exactly one input whose outpoint
    /// carries the empty previous hash.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0]
                .previous_transaction_outpoint
                .previous_transaction_hash
                .is_empty()
    }

    /// Digest of the outputs alone, used as the signature preimage.
    pub fn hash_for_signature(&self) -> Hash {
        let mut hasher = Sha256::new();
        for output in &self.outputs {
            output.absorb(&mut hasher);
        }
        Hash::from_bytes(hasher.finalize().to_vec())
    }

    /// The transaction's identity: digest of inputs followed by outputs.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        for input in &self.inputs {
            input.absorb(&mut hasher);
        }
        for output in &self.outputs {
            output.absorb(&mut hasher);
        }
        Hash::from_bytes(hasher.finalize().to_vec())
    }
}

/// The coinbase paying this node's block reward.
pub fn make_reward_transaction(ctx: &NodeContext) -> Transaction {
    Transaction {
        inputs: vec![TransactionInput {
            previous_transaction_outpoint: TransactionOutpoint {
                previous_transaction_hash: Hash::empty(),
                index: 0,
            },
            signature: Vec::new(),
        }],
        outputs: vec![TransactionOutput {
            value: crate::ledger::BLOCK_REWARD,
            recipient_public_key: ctx.public_key.clone(),
        }],
    }
}
